use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables overriding the `[remote]` section
pub const ENV_APP_ID: &str = "CXNET_APP_ID";
pub const ENV_APP_KEY: &str = "CXNET_APP_KEY";
pub const ENV_SERVER_URL: &str = "CXNET_SERVER_URL";

/// Which adapter a deployment persists through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

/// Contents of `cxnet.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CxnetConfig {
    pub backend: Option<BackendKind>,
    pub database: Option<String>,
    pub static_dir: Option<String>,
    pub remote: Option<RemoteSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteSection {
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    pub server_url: Option<String>,
}

/// Credentials of the hosted object storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub app_id: String,
    pub app_key: String,
    pub server_url: String,
}

/// Effective settings after merging file, environment and flags
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendKind,
    pub database: PathBuf,
    pub static_dir: PathBuf,
    pub remote: Option<RemoteConfig>,
}

impl Settings {
    /// Merge a config file with the environment.
    ///
    /// `env` is a lookup so tests can supply their own variables.
    pub fn resolve(
        config: Option<&CxnetConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let config = config.cloned().unwrap_or_default();
        let section = config.remote.unwrap_or_default();

        let app_id = env(ENV_APP_ID).or(section.app_id);
        let app_key = env(ENV_APP_KEY).or(section.app_key);
        let server_url = env(ENV_SERVER_URL).or(section.server_url);

        let remote = match (app_id, app_key, server_url) {
            (Some(app_id), Some(app_key), Some(server_url)) => Some(RemoteConfig {
                app_id,
                app_key,
                server_url,
            }),
            (None, None, None) => None,
            _ => anyhow::bail!(
                "incomplete [remote] settings: app_id, app_key and server_url must all be set"
            ),
        };

        Ok(Self {
            backend: config.backend.unwrap_or_default(),
            database: config
                .database
                .map(PathBuf::from)
                .unwrap_or_else(|| default_database_path_in(Path::new("."))),
            static_dir: config
                .static_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            remote,
        })
    }

    /// Remote credentials, required when the remote backend is selected
    pub fn require_remote(&self) -> anyhow::Result<&RemoteConfig> {
        self.remote.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "remote backend selected but no [remote] settings found (set them in cxnet.toml or {})",
                ENV_APP_KEY
            )
        })
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("cxnet.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".cxnet").join("cxnet.db")
}

/// Config written by `cxnet init`
pub fn starter_config() -> CxnetConfig {
    CxnetConfig {
        backend: Some(BackendKind::Local),
        database: Some(default_database_path_in(Path::new(".")).to_string_lossy().into_owned()),
        static_dir: Some("public".to_string()),
        remote: None,
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CxnetConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CxnetConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CxnetConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".cxnet/";

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if existing.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
    }

    let mut content = String::new();
    if gitignore_path.exists() {
        content.push_str(&std::fs::read_to_string(&gitignore_path)?);
        if !content.ends_with('\n') {
            content.push('\n');
        }
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}
