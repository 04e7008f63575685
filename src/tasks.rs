//! Task handlers the local execution engine dispatches to.
//!
//! Tasks hand a [`DrawInputs`] record down the chain: each import adds the
//! key of the document it checked, the draw task adds its config and sort,
//! and publishing records the exported artifacts.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use huntdraw_artifact::{Store, put_json};
use huntdraw_compiler::ResourceRegistry;
use huntdraw_config::{DataSourceKind, TaskKind};
use huntdraw_draw::{DrawArtifacts, DrawInputs, DrawTask, read_applicants, read_hunt_codes};
use huntdraw_engine::{LocalExecutionEngine, TaskError, TaskHandler, TaskInvocation};
use serde_json::{Value, json};
use tracing::info;

/// A local engine with a handler for every task kind the registry routes.
pub fn local_engine(
  blobs: Arc<dyn Store>,
  registry: &ResourceRegistry,
  activation_polls: u32,
) -> LocalExecutionEngine {
  let mut engine = LocalExecutionEngine::new().with_activation_polls(activation_polls);
  for kind in TaskKind::ALL {
    let Some(resource_ref) = registry.resolve(kind) else {
      continue;
    };
    let handler: Arc<dyn TaskHandler> = match kind {
      TaskKind::HuntCodeImport => Arc::new(ImportHandler::new(
        blobs.clone(),
        DataSourceKind::HuntCodeFile,
      )),
      TaskKind::ApplicantImport => Arc::new(ImportHandler::new(
        blobs.clone(),
        DataSourceKind::ApplicantFile,
      )),
      TaskKind::Draw => Arc::new(DrawHandler::new(blobs.clone())),
      TaskKind::ResultPublish => Arc::new(PublishHandler::new(blobs.clone())),
    };
    engine = engine.with_handler(resource_ref, handler);
  }
  engine
}

fn draw_inputs(invocation: &TaskInvocation) -> Result<DrawInputs, TaskError> {
  if invocation.previous.is_null() {
    return Ok(DrawInputs::default());
  }
  serde_json::from_value(invocation.previous.clone()).map_err(|e| {
    TaskError::new(format!(
      "node '{}' received malformed draw inputs: {}",
      invocation.node_id, e
    ))
  })
}

fn override_key(invocation: &TaskInvocation, source: DataSourceKind) -> Option<String> {
  invocation
    .parameters
    .overrides
    .iter()
    .find(|o| o.source == source)
    .map(|o| o.key.clone())
}

fn apply_overrides(inputs: &mut DrawInputs, invocation: &TaskInvocation) {
  let keys = [
    (DataSourceKind::HuntCodeFile, &mut inputs.hunt_codes_key),
    (DataSourceKind::ApplicantFile, &mut inputs.applicants_key),
    (DataSourceKind::DrawConfigFile, &mut inputs.config_key),
    (DataSourceKind::DrawSortFile, &mut inputs.sort_key),
  ];
  for (source, slot) in keys {
    if let Some(key) = override_key(invocation, source) {
      *slot = Some(key);
    }
  }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, TaskError> {
  serde_json::to_value(value).map_err(TaskError::new)
}

/// Checks that an uploaded hunt-code or applicant CSV parses, and passes
/// its key on.
pub struct ImportHandler {
  blobs: Arc<dyn Store>,
  source: DataSourceKind,
}

impl ImportHandler {
  pub fn new(blobs: Arc<dyn Store>, source: DataSourceKind) -> Self {
    Self { blobs, source }
  }
}

#[async_trait]
impl TaskHandler for ImportHandler {
  async fn run(&self, invocation: TaskInvocation) -> Result<Value, TaskError> {
    let mut inputs = draw_inputs(&invocation)?;
    apply_overrides(&mut inputs, &invocation);

    let key = match self.source {
      DataSourceKind::HuntCodeFile => inputs.hunt_codes_key.clone(),
      _ => inputs.applicants_key.clone(),
    }
    .ok_or_else(|| TaskError::new(format!("no {} document attached", self.source.as_str())))?;

    let data = self.blobs.get(&key).await.map_err(TaskError::new)?;
    let rows = match self.source {
      DataSourceKind::HuntCodeFile => read_hunt_codes(&data).map(|rows| rows.len()),
      _ => read_applicants(&data).map(|rows| rows.len()),
    }
    .map_err(TaskError::new)?;

    info!(node_id = %invocation.node_id, %key, rows, "imported document");
    to_value(&inputs)
  }
}

pub struct DrawHandler {
  task: DrawTask,
}

impl DrawHandler {
  pub fn new(blobs: Arc<dyn Store>) -> Self {
    Self {
      task: DrawTask::new(blobs),
    }
  }
}

#[async_trait]
impl TaskHandler for DrawHandler {
  async fn run(&self, invocation: TaskInvocation) -> Result<Value, TaskError> {
    let mut inputs = draw_inputs(&invocation)?;
    apply_overrides(&mut inputs, &invocation);

    let draw_id = invocation
      .workflow_job_id()
      .unwrap_or(&invocation.node_id)
      .to_string();
    let artifacts = self
      .task
      .run(&draw_id, &inputs)
      .await
      .map_err(TaskError::new)?;
    to_value(&artifacts)
  }
}

/// Writes a manifest naming a draw's exported artifacts.
pub struct PublishHandler {
  blobs: Arc<dyn Store>,
}

impl PublishHandler {
  pub fn new(blobs: Arc<dyn Store>) -> Self {
    Self { blobs }
  }
}

#[async_trait]
impl TaskHandler for PublishHandler {
  async fn run(&self, invocation: TaskInvocation) -> Result<Value, TaskError> {
    let artifacts: DrawArtifacts = serde_json::from_value(invocation.previous.clone())
      .map_err(|e| TaskError::new(format!("previous task produced no draw results: {}", e)))?;

    let organization_id = invocation.organization_id().unwrap_or("default");
    let job_id = invocation.workflow_job_id().unwrap_or(&invocation.node_id);
    let key = format!("published/{}/{}/manifest.json", organization_id, job_id);
    put_json(self.blobs.as_ref(), &key, &artifacts)
      .await
      .map_err(TaskError::new)?;

    info!(%key, "published draw results");
    Ok(json!({ "manifestKey": key, "artifacts": artifacts }))
  }
}

/// Copy a local file into the blob store under `key`.
pub async fn upload(
  blobs: &dyn Store,
  key: &str,
  data: Vec<u8>,
  content_type: &str,
) -> Result<(), huntdraw_artifact::Error> {
  blobs.put(key, Bytes::from(data), content_type).await
}

#[cfg(test)]
mod tests {
  use super::*;

  use huntdraw_artifact::MemoryStore;
  use huntdraw_compiler::{OverrideParameter, TaskParameters};
  use huntdraw_config::DocumentType;

  fn invocation(previous: Value, overrides: Vec<OverrideParameter>) -> TaskInvocation {
    TaskInvocation {
      node_id: "import".to_string(),
      input: json!({ "organizationId": "org-1", "workflowJobId": "job-1" }),
      parameters: TaskParameters {
        organization_id: "$.organizationId".to_string(),
        workflow_job_id: "$.workflowJobId".to_string(),
        previous_node_id: None,
        previous_result: None,
        seed: Some(json!({})),
        overrides,
      },
      previous,
    }
  }

  fn csv_override(key: &str) -> OverrideParameter {
    OverrideParameter {
      node_id: "codes".to_string(),
      source: DataSourceKind::HuntCodeFile,
      document_id: "doc-1".to_string(),
      key: key.to_string(),
      document_type: DocumentType::Csv,
    }
  }

  #[tokio::test]
  async fn test_import_passes_key_on() {
    let blobs = Arc::new(MemoryStore::new());
    let csv = "code,description,is_valid,is_in_draw,total_quota,quota_balance,total_quota_in_this_draw,quota_balance_in_this_draw,quota_awarded_in_this_draw,total_quota_awarded,nr_has_hard_cap,nr_cap_percent,nr_total_quota,nr_quota_balance,nr_quota_awarded_in_this_draw,nr_total_quota_awarded,res_quota_awarded_in_this_draw,res_total_quota_awarded,wp_res_is_alloc_enabled,wp_res_cap_percent,wp_res_total_quota,wp_res_quota_balance,wp_res_quota_awarded_in_this_draw\nE1,Elk,Y,Y,3,,,,,,N,,,,,,,,N,,,,\n";
    upload(blobs.as_ref(), "up/codes.csv", csv.as_bytes().to_vec(), "text/csv")
      .await
      .unwrap();

    let handler = ImportHandler::new(blobs, DataSourceKind::HuntCodeFile);
    let output = handler
      .run(invocation(json!({}), vec![csv_override("up/codes.csv")]))
      .await
      .unwrap();
    assert_eq!(output["huntCodesKey"], "up/codes.csv");
  }

  #[tokio::test]
  async fn test_import_without_document_fails() {
    let handler = ImportHandler::new(Arc::new(MemoryStore::new()), DataSourceKind::ApplicantFile);
    let err = handler.run(invocation(json!({}), vec![])).await.unwrap_err();
    assert!(err.message.contains("applicant_file"));
  }

  #[tokio::test]
  async fn test_malformed_previous_output_is_reported() {
    let handler = ImportHandler::new(Arc::new(MemoryStore::new()), DataSourceKind::HuntCodeFile);
    let err = handler
      .run(invocation(
        json!({ "huntCodesKey": 7 }),
        vec![csv_override("up/codes.csv")],
      ))
      .await
      .unwrap_err();
    assert!(err.message.contains("malformed draw inputs"));
  }

  #[tokio::test]
  async fn test_publish_requires_draw_results() {
    let handler = PublishHandler::new(Arc::new(MemoryStore::new()));
    let err = handler
      .run(invocation(json!({ "huntCodesKey": "x" }), vec![]))
      .await
      .unwrap_err();
    assert!(err.message.contains("no draw results"));
  }
}
