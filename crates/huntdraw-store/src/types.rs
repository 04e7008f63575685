use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Build status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InstanceStatus {
  BuildNeeded,
  BuildStarted,
  /// Terminal. A new instance is needed to retry.
  BuildFailed,
  Ready,
}

/// A buildable instance of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowInstance {
  pub id: String,
  pub workflow_id: String,
  pub organization_id: String,
  pub status: InstanceStatus,
  /// Blob-store key of the compiled definition.
  pub definition_ref: Option<String>,
  /// Handle of the resource registered with the execution engine.
  pub execution_handle_ref: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
  /// Create a new instance in `BuildNeeded`.
  pub fn new(organization_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      workflow_id: workflow_id.into(),
      organization_id: organization_id.into(),
      status: InstanceStatus::BuildNeeded,
      definition_ref: None,
      execution_handle_ref: None,
      created_at: now,
      updated_at: now,
    }
  }
}

/// One triggered execution of a workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowJob {
  pub id: String,
  pub workflow_instance_id: String,
  pub execution_handle_ref: Option<String>,
  pub pre_execution_failure: Option<bool>,
  pub created_at: DateTime<Utc>,
}

impl WorkflowJob {
  pub fn new(workflow_instance_id: impl Into<String>) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      workflow_instance_id: workflow_instance_id.into(),
      execution_handle_ref: None,
      pre_execution_failure: None,
      created_at: Utc::now(),
    }
  }
}

/// A structured log row attached to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobLog {
  pub id: String,
  pub workflow_job_id: String,
  pub message_key: String,
  pub params: Json<serde_json::Value>,
  pub created_at: DateTime<Utc>,
}

impl JobLog {
  pub fn new(
    workflow_job_id: impl Into<String>,
    message_key: impl Into<String>,
    params: serde_json::Value,
  ) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      workflow_job_id: workflow_job_id.into(),
      message_key: message_key.into(),
      params: Json(params),
      created_at: Utc::now(),
    }
  }
}
