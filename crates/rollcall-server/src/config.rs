//! Server configuration.
//!
//! Layered from an optional TOML file and `ROLLCALL_*` environment
//! variables, on top of the defaults below.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  pub store_path:               PathBuf,
  /// Accounts may only be created for emails in this domain.
  pub approved_domain:          String,
  pub instructor_username:      String,
  /// Argon2 PHC string; generate with `rollcall --hash-password`.
  pub instructor_password_hash: String,
  /// Idempotency keys older than this are pruned at startup. `0` keeps them
  /// forever.
  pub event_retention_days:     u32,
}

impl ServerConfig {
  /// Load from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::build(File::from(path).required(false))
  }

  fn build(file: impl Source + Send + Sync + 'static) -> Result<Self, ConfigError> {
    Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("store_path", "~/.local/share/rollcall/rollcall.db")?
      .set_default("approved_domain", "miamioh.edu")?
      .set_default("event_retention_days", 90)?
      .add_source(file)
      .add_source(Environment::with_prefix("ROLLCALL"))
      .build()?
      .try_deserialize()
  }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
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
  use config::FileFormat;

  use super::*;

  #[test]
  fn toml_overrides_defaults() {
    let toml = r#"
      port = 9000
      instructor_username = "prof"
      instructor_password_hash = "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA"
    "#;
    let cfg = ServerConfig::build(File::from_str(toml, FileFormat::Toml)).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.approved_domain, "miamioh.edu");
    assert_eq!(cfg.instructor_username, "prof");
    assert_eq!(cfg.event_retention_days, 90);
  }

  #[test]
  fn missing_credentials_fail() {
    let err = ServerConfig::build(File::from_str("", FileFormat::Toml));
    assert!(err.is_err());
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    let expanded = expand_tilde(Path::new("~/rollcall.db"));
    assert_eq!(expanded, PathBuf::from(home).join("rollcall.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
  }
}
