//! Runtime configuration, deserialised from `config.toml` and `LINKID_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, ensure};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  #[serde(default = "default_timeout_ms")]
  pub store_busy_timeout_ms: u64,
  #[serde(default = "default_timeout_ms")]
  pub identify_timeout_ms:   u64,
}

fn default_timeout_ms() -> u64 { 5_000 }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `LINKID_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("LINKID"))
      .build()
      .context("failed to read config file")?;

    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> anyhow::Result<()> {
    ensure!(!self.host.trim().is_empty(), "host must not be empty");
    ensure!(self.port != 0, "port must be non-zero");
    ensure!(!self.store_path.as_os_str().is_empty(), "store_path must not be empty");
    ensure!(self.store_busy_timeout_ms > 0, "store_busy_timeout_ms must be non-zero");
    ensure!(self.identify_timeout_ms > 0, "identify_timeout_ms must be non-zero");
    Ok(())
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_busy_timeout(&self) -> Duration { Duration::from_millis(self.store_busy_timeout_ms) }

  pub fn identify_timeout(&self) -> Duration { Duration::from_millis(self.identify_timeout_ms) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> anyhow::Result<ServerConfig> {
    let cfg: ServerConfig = Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()?
      .try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
  }

  #[test]
  fn full_config() {
    let cfg = parse(
      r#"
      host = "0.0.0.0"
      port = 9000
      store_path = "/var/lib/linkid/contacts.db"
      store_busy_timeout_ms = 250
      identify_timeout_ms = 1500
      "#,
    )
    .unwrap();

    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/linkid/contacts.db"));
    assert_eq!(cfg.store_busy_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.identify_timeout(), Duration::from_millis(1500));
  }

  #[test]
  fn timeouts_default() {
    let cfg = parse(
      r#"
      host = "127.0.0.1"
      port = 8080
      store_path = "contacts.db"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.store_busy_timeout_ms, 5_000);
    assert_eq!(cfg.identify_timeout_ms, 5_000);
  }

  #[test]
  fn missing_required_field_fails() {
    assert!(parse(r#"host = "127.0.0.1""#).is_err());
  }

  #[test]
  fn zero_values_fail_validation() {
    assert!(parse("host = \"h\"\nport = 0\nstore_path = \"c.db\"").is_err());
    assert!(parse("host = \"h\"\nport = 1\nstore_path = \"c.db\"\nidentify_timeout_ms = 0").is_err());
    assert!(parse("host = \"h\"\nport = 1\nstore_path = \"\"").is_err());
  }

  #[test]
  fn tilde_expansion() {
    let plain = PathBuf::from("/tmp/contacts.db");
    assert_eq!(expand_tilde(&plain), plain);

    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/contacts.db")),
        PathBuf::from(home).join("contacts.db")
      );
    }
  }
}
