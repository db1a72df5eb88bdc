//! Configuration for the `cadence` binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cadence_core::config::EngineConfig;
use serde::Deserialize;

/// Shape of `cadence.toml`. Every field is optional; `CADENCE_*` environment
/// variables override the file (e.g. `CADENCE_STORE_PATH`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
  pub store_path: PathBuf,
  pub engine:     EngineConfig,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("cadence.db"),
      engine:     EngineConfig::default(),
    }
  }
}

impl CliConfig {
  /// Layer the config file at `path` (if present) under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CADENCE").separator("__"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
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
  use cadence_core::{config::MissingBaseEvent, describe::Locale};

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = CliConfig::load(Path::new("/nonexistent/cadence.toml")).unwrap();
    assert_eq!(cfg.engine.reconcile_limit, 100);
    assert_eq!(cfg.engine.display_limit, 720);
    assert_eq!(cfg.engine.missing_base_event, MissingBaseEvent::Skip);
  }

  #[test]
  fn engine_table_deserialises() {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(
        r#"
          store_path = "/tmp/cal.db"

          [engine]
          reconcile_limit = 30
          missing_base_event = "error"
          locale = "fr"
        "#,
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap();
    let cfg: CliConfig = settings.try_deserialize().unwrap();

    assert_eq!(cfg.store_path, PathBuf::from("/tmp/cal.db"));
    assert_eq!(cfg.engine.reconcile_limit, 30);
    assert_eq!(cfg.engine.display_limit, 720);
    assert_eq!(cfg.engine.missing_base_event, MissingBaseEvent::Error);
    assert_eq!(cfg.engine.locale, Locale::Fr);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/cal/cadence.db")),
      PathBuf::from(home).join("cal/cadence.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }
}
