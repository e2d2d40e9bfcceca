//! The subsystem's own TOML configuration — not the out-of-scope INI brick
//! language (SPEC_FULL.md §6), just the listen/buffer/logging knobs a
//! runnable server needs: `listen_port`, `buf_cap` (BUF_CAP per connection,
//! per ring), `max_connections`, and a `[logging]` table.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, ServerError};

fn default_buf_cap() -> usize {
    65536
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen_port: u16,
    #[serde(default = "default_buf_cap")]
    pub buf_cap: usize,
    /// `0` means unbounded, matching spec.md's data model (no stated cap).
    #[serde(default)]
    pub max_connections: usize,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reads, parses, and validates a config file. Parse and validation
/// failures both surface as [`ServerError::Config`], following the
/// teacher's `loader::load_from_path` shape (read -> parse -> validate,
/// each stage's error wrapped into the crate's own error enum).
pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .map_err(|e| ServerError::Config(format!("failed to read config file: {e}")))?;
    let cfg: Config =
        toml::from_str(&text).map_err(|e| ServerError::Config(format!("failed to parse config: {e}")))?;
    validate_config(&cfg)?;
    Ok(cfg)
}

fn validate_config(cfg: &Config) -> Result<()> {
    if !cfg.buf_cap.is_power_of_two() {
        return Err(ServerError::Config(format!("buf_cap {} must be a power of two", cfg.buf_cap)));
    }
    let min = kennyfs_core::connection::min_buf_cap();
    if cfg.buf_cap < min {
        return Err(ServerError::Config(format!(
            "buf_cap {} is smaller than the minimum {min} needed to carry one SOP handshake plus an empty request",
            cfg.buf_cap
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let f = write_config("listen_port = 6000\n");
        let cfg = load_from_path(f.path()).unwrap();
        assert_eq!(cfg.listen_port, 6000);
        assert_eq!(cfg.buf_cap, 65536);
        assert_eq!(cfg.max_connections, 0);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn rejects_non_power_of_two_buf_cap() {
        let f = write_config("listen_port = 6000\nbuf_cap = 1000\n");
        assert!(matches!(load_from_path(f.path()), Err(ServerError::Config(_))));
    }

    #[test]
    fn rejects_buf_cap_below_minimum() {
        let f = write_config("listen_port = 6000\nbuf_cap = 8\n");
        assert!(matches!(load_from_path(f.path()), Err(ServerError::Config(_))));
    }

    #[test]
    fn rejects_missing_file() {
        assert!(matches!(load_from_path("/nonexistent/path.toml"), Err(ServerError::Config(_))));
    }
}
