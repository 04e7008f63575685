use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the build orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
  /// Delay between resource readiness polls.
  #[serde(rename = "poll_interval_ms", with = "millis")]
  pub poll_interval: Duration,
  /// Longest the await-ready stage waits before failing with a timeout.
  #[serde(rename = "max_wait_ms", with = "millis")]
  pub max_wait: Duration,
  /// Blob-store key prefix for compiled definitions.
  pub definition_prefix: String,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_secs(1),
      max_wait: Duration::from_secs(300),
      definition_prefix: "workflows".to_string(),
    }
  }
}

mod millis {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
  }
}
