use serde::{Deserialize, Serialize};

/// Identifiers shared by every stage of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildContext {
  pub organization_id: String,
  pub workflow_id: String,
  pub workflow_instance_id: String,
  /// Job to trigger and to attribute failures to, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub workflow_job_id: Option<String>,
}

impl BuildContext {
  pub fn new(
    organization_id: impl Into<String>,
    workflow_id: impl Into<String>,
    workflow_instance_id: impl Into<String>,
  ) -> Self {
    Self {
      organization_id: organization_id.into(),
      workflow_id: workflow_id.into(),
      workflow_instance_id: workflow_instance_id.into(),
      workflow_job_id: None,
    }
  }

  pub fn with_job(mut self, workflow_job_id: impl Into<String>) -> Self {
    self.workflow_job_id = Some(workflow_job_id.into());
    self
  }

  /// Execution input handed to the engine when a job is triggered.
  pub fn execution_input(&self) -> serde_json::Value {
    serde_json::json!({
      "organizationId": self.organization_id,
      "workflowId": self.workflow_id,
      "workflowInstanceId": self.workflow_instance_id,
      "workflowJobId": self.workflow_job_id,
    })
  }
}
