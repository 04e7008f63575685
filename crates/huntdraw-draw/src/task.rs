use std::sync::Arc;

use bytes::Bytes;
use huntdraw_artifact::{CONTENT_TYPE_CSV, Store, get_json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::run_draw;
use crate::error::DrawError;
use crate::export::{read_applicants, read_hunt_codes, write_applicants, write_hunt_codes, write_metrics};
use crate::metrics::DrawMetrics;
use crate::types::{DrawConfig, DrawSort};

/// Blob keys a draw reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawInputs {
  pub hunt_codes_key: Option<String>,
  pub applicants_key: Option<String>,
  pub config_key: Option<String>,
  /// Falls back to the config's `sortRef`.
  pub sort_key: Option<String>,
}

/// Blob keys a draw wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawArtifacts {
  pub hunt_codes_key: String,
  pub applicants_key: String,
  pub metrics_key: String,
  pub hunt_codes_used_in_draw: Vec<String>,
  pub metrics: DrawMetrics,
}

/// Loads draw inputs from the blob store, runs the draw and writes the
/// results back as new, uniquely named CSV artifacts.
pub struct DrawTask {
  blobs: Arc<dyn Store>,
  prefix: String,
}

impl DrawTask {
  pub fn new(blobs: Arc<dyn Store>) -> Self {
    Self {
      blobs,
      prefix: "draws".to_string(),
    }
  }

  pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.prefix = prefix.into();
    self
  }

  pub async fn run(&self, draw_id: &str, inputs: &DrawInputs) -> Result<DrawArtifacts, DrawError> {
    let config_key = inputs.config_key.as_deref().ok_or(DrawError::MissingConfig)?;
    let config: DrawConfig = get_json(self.blobs.as_ref(), config_key).await?;

    let sort_key = inputs
      .sort_key
      .as_deref()
      .or(config.sort_ref.as_deref())
      .ok_or(DrawError::MissingSortRules)?;
    let sort: DrawSort = get_json(self.blobs.as_ref(), sort_key).await?;
    if sort.rules.is_empty() {
      return Err(DrawError::MissingSortRules);
    }

    let hunt_codes_key = inputs
      .hunt_codes_key
      .as_deref()
      .ok_or(DrawError::MissingInput("hunt codes"))?;
    let applicants_key = inputs
      .applicants_key
      .as_deref()
      .ok_or(DrawError::MissingInput("applicants"))?;
    let hunt_codes = read_hunt_codes(&self.blobs.get(hunt_codes_key).await?)?;
    let applicants = read_applicants(&self.blobs.get(applicants_key).await?)?;

    info!(
      draw_id,
      hunt_codes = hunt_codes.len(),
      applicants = applicants.len(),
      "loaded draw inputs"
    );

    let result = tokio::task::spawn_blocking(move || {
      run_draw(&hunt_codes, &applicants, &sort, &config)
    })
    .await??;
    let metrics = DrawMetrics::from_result(&result);

    let hunt_codes_key = self
      .put_csv(draw_id, "hunt-codes", write_hunt_codes(&result.hunt_code_results)?)
      .await?;
    let applicants_key = self
      .put_csv(draw_id, "applicants", write_applicants(&result.applicant_results)?)
      .await?;
    let metrics_key = self
      .put_csv(draw_id, "metrics", write_metrics(&metrics.rows())?)
      .await?;

    info!(draw_id, %hunt_codes_key, %applicants_key, %metrics_key, "exported draw results");
    Ok(DrawArtifacts {
      hunt_codes_key,
      applicants_key,
      metrics_key,
      hunt_codes_used_in_draw: result.hunt_codes_used_in_draw,
      metrics,
    })
  }

  async fn put_csv(&self, draw_id: &str, name: &str, body: Vec<u8>) -> Result<String, DrawError> {
    let key = format!("{}/{}/{}-{}.csv", self.prefix, draw_id, name, Uuid::new_v4());
    self
      .blobs
      .put(&key, Bytes::from(body), CONTENT_TYPE_CSV)
      .await?;
    Ok(key)
  }
}
