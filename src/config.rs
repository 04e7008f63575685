use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use huntdraw_compiler::ResourceRegistry;
use huntdraw_config::TaskKind;
use huntdraw_orchestrator::OrchestratorConfig;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "huntdraw.toml";

/// Contents of `huntdraw.toml` in the data directory.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub orchestrator: OrchestratorConfig,
  /// Task kind (e.g. `draw`) to execution-engine resource reference.
  pub resources: BTreeMap<String, String>,
}

impl AppConfig {
  /// Load the config file from `data_dir`, or defaults if there is none.
  pub fn load(data_dir: &Path) -> Result<Self> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
      return Ok(Self::default());
    }
    let content = std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
      .with_context(|| format!("failed to parse config file: {}", path.display()))
  }

  /// `local:<kind>` for every task kind, with configured overrides applied.
  pub fn registry(&self) -> Result<ResourceRegistry> {
    let mut registry = ResourceRegistry::local();
    for (kind, resource_ref) in &self.resources {
      let kind: TaskKind = kind
        .parse()
        .with_context(|| format!("invalid task kind in [resources]: {}", kind))?;
      registry.insert(kind, resource_ref.clone());
    }
    Ok(registry)
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[test]
  fn test_parse_config() {
    let config: AppConfig = toml::from_str(
      r#"
      [orchestrator]
      poll_interval_ms = 200
      max_wait_ms = 5000

      [resources]
      draw = "remote:draw-v2"
      "#,
    )
    .unwrap();

    assert_eq!(config.orchestrator.poll_interval, Duration::from_millis(200));
    assert_eq!(config.orchestrator.max_wait, Duration::from_secs(5));

    let registry = config.registry().unwrap();
    assert_eq!(registry.resolve(TaskKind::Draw), Some("remote:draw-v2"));
    assert_eq!(
      registry.resolve(TaskKind::HuntCodeImport),
      Some("local:hunt_code_import")
    );
  }

  #[test]
  fn test_unknown_kind_is_rejected() {
    let config: AppConfig = toml::from_str("[resources]\nhunt_code_file = \"x\"").unwrap();
    assert!(config.registry().is_err());
  }

  #[test]
  fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(dir.path()).unwrap();
    assert_eq!(config.orchestrator, OrchestratorConfig::default());
    assert!(config.resources.is_empty());
  }
}
