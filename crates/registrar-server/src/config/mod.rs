//! Server config loader (strict parsing, env overrides, validation).

pub mod schema;

use std::{fs, io};

use registrar_core::error::{RegistrarError, Result};

pub use schema::{DatabaseSection, MetricsSection, ServerConfig, ServerSection};

/// Config file used when `REGISTRAR_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "registrar.yaml";

/// Load the process config: file (or defaults if absent), then the
/// environment, then validation. Read once at startup.
pub fn load() -> Result<ServerConfig> {
    let path = std::env::var("REGISTRAR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut cfg = match fs::read_to_string(&path) {
        Ok(s) => parse(&s)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            ServerConfig::default()
        }
        Err(e) => return Err(RegistrarError::Config(format!("read {path} failed: {e}"))),
    };
    cfg.apply_env(|k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RegistrarError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg = parse(s)?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse(s: &str) -> Result<ServerConfig> {
    serde_yaml::from_str(s).map_err(|e| RegistrarError::Config(format!("invalid yaml: {e}")))
}
