// src/config/mod.rs
//! Service configuration. Supports TOML or JSON files.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//!
//! [display]
//! placeholder_image = "/images/product-placeholder.jpg"
//! placeholder_vendor = "Fournisseur"
//! product_title_prefix = "Produit"
//! ```

mod funnel;

pub use funnel::{FunnelConfig, ServerConfig};

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_CONFIG_PATH: &str = "FUNNEL_CONFIG_PATH";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const DEFAULT_TOML_PATH: &str = "config/funnel.toml";
pub const DEFAULT_JSON_PATH: &str = "config/funnel.json";

/// Load config from an explicit path; the extension picks the format first.
pub fn load_from(path: &Path) -> Result<FunnelConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading funnel config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse(&content, ext.as_str())
        .with_context(|| format!("parsing funnel config {}", path.display()))?;
    info!(path = %path.display(), bind = %cfg.server.bind, "config loaded");
    Ok(cfg)
}

/// Load config using env var + fallbacks:
/// 1) $FUNNEL_CONFIG_PATH
/// 2) config/funnel.toml
/// 3) config/funnel.json
/// 4) built-in defaults
///
/// `$BIND_ADDR` overrides the bind address in every case.
pub fn load_default() -> Result<FunnelConfig> {
    let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        load_from(&pb)?
    } else if Path::new(DEFAULT_TOML_PATH).exists() {
        load_from(Path::new(DEFAULT_TOML_PATH))?
    } else if Path::new(DEFAULT_JSON_PATH).exists() {
        load_from(Path::new(DEFAULT_JSON_PATH))?
    } else {
        FunnelConfig::default()
    };

    if let Ok(bind) = std::env::var(ENV_BIND_ADDR) {
        if !bind.trim().is_empty() {
            cfg.server.bind = bind.trim().to_string();
        }
    }
    Ok(cfg)
}

fn parse(s: &str, hint_ext: &str) -> Result<FunnelConfig> {
    let try_json_first = hint_ext == "json" || s.trim_start().starts_with('{');
    let parsed = if try_json_first {
        serde_json::from_str::<FunnelConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| toml::from_str::<FunnelConfig>(s).map_err(anyhow::Error::from))
    } else {
        toml::from_str::<FunnelConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str::<FunnelConfig>(s).map_err(anyhow::Error::from))
    };
    parsed
        .map(FunnelConfig::sanitized)
        .map_err(|e| anyhow!("unsupported funnel config format: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_formats_work() {
        let toml = r#"
[server]
bind = "127.0.0.1:9000"

[display]
placeholder_vendor = "Vendeur"
"#;
        let cfg = parse(toml, "toml").unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.display.placeholder_vendor, "Vendeur");
        assert_eq!(cfg.display.product_title_prefix, "Produit");

        let json = r#"{"display": {"placeholder_image": "/img/none.png"}}"#;
        let cfg = parse(json, "json").unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.display.placeholder_image, "/img/none.png");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = parse(
            r#"
[server]
bind = " "
[display]
placeholder_vendor = ""
"#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg, FunnelConfig::default());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse("bind = [", "toml").is_err());
    }
}
