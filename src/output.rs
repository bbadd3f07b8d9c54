//! Machine-readable output for `--json` runs

use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `CXNET_QUIET=1` turns off colors and decorations
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("CXNET_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    ok: bool,
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn render(envelope: &Envelope<'_>) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(envelope)?)
}

/// Print a success envelope; no-op in human mode
pub fn emit_success(mode: OutputMode, command: &str, data: Value) -> anyhow::Result<()> {
    if mode.is_human() {
        return Ok(());
    }
    println!(
        "{}",
        render(&Envelope {
            ok: true,
            command,
            data: Some(data),
            error: None,
        })?
    );
    Ok(())
}

/// Print a failure envelope to stdout so scripts can parse it
pub fn emit_error(command: &str, error: &anyhow::Error) -> anyhow::Result<()> {
    println!(
        "{}",
        render(&Envelope {
            ok: false,
            command,
            data: None,
            error: Some(format!("{:#}", error)),
        })?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let rendered = render(&Envelope {
            ok: true,
            command: "list",
            data: Some(serde_json::json!([1, 2])),
            error: None,
        })
        .unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, serde_json::json!({"ok": true, "command": "list", "data": [1, 2]}));
    }

    #[test]
    fn test_output_mode_from_flag() {
        assert!(OutputMode::from_flag(false).is_human());
        assert!(!OutputMode::from_flag(true).is_human());
    }
}
