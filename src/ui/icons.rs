pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const CLOUD: &str = "☁️";
    pub const EXPORT: &str = "📤";
    pub const IMPORT: &str = "📥";
    pub const MESSAGE: &str = "💬";
    pub const LIKE: &str = "👍";
    pub const DEL: &str = "🗑️";
    pub const NEW: &str = "✨";
    pub const MOD: &str = "📝";
    pub const GLOBE: &str = "🌍";
    pub const EMPTY: &str = "∅";
}
