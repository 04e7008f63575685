use std::collections::{BTreeMap, HashSet};

use huntdraw_config::{DataSourceKind, DocumentType};
use serde::{Deserialize, Serialize};

/// Execution-input path carrying the organization id.
pub const ORGANIZATION_ID_PATH: &str = "$.organizationId";
/// Execution-input path carrying the workflow job id.
pub const WORKFLOW_JOB_ID_PATH: &str = "$.workflowJobId";

/// A compiled, linear task chain ready to be registered with the
/// execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChainDefinition {
  pub start_node_id: String,
  pub tasks: BTreeMap<String, Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub resource_ref: String,
  pub parameters: TaskParameters,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next: Option<String>,
  #[serde(default)]
  pub terminal: bool,
}

/// Parameters wired into a task invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskParameters {
  pub organization_id: String,
  pub workflow_job_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub previous_node_id: Option<String>,
  /// Path to the previous task's result in the execution state.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub previous_result: Option<String>,
  /// Result seed for the start task, which has no predecessor.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub seed: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub overrides: Vec<OverrideParameter>,
}

/// A document handed to a task by a data-source node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideParameter {
  pub node_id: String,
  pub source: DataSourceKind,
  pub document_id: String,
  pub key: String,
  pub document_type: DocumentType,
}

impl TaskChainDefinition {
  /// Path under which a task's result is stored in the execution state.
  pub fn result_path(node_id: &str) -> String {
    format!("$.results.{}", node_id)
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  /// Iterate tasks in chain order, starting from the start task.
  ///
  /// Stops at the terminal task, a dangling `next`, or the first revisit.
  pub fn chain(&self) -> Chain<'_> {
    Chain {
      definition: self,
      current: Some(self.start_node_id.as_str()),
      seen: HashSet::new(),
    }
  }
}

pub struct Chain<'a> {
  definition: &'a TaskChainDefinition,
  current: Option<&'a str>,
  seen: HashSet<&'a str>,
}

impl<'a> Iterator for Chain<'a> {
  type Item = (&'a str, &'a Task);

  fn next(&mut self) -> Option<Self::Item> {
    let id = self.current.take()?;
    if !self.seen.insert(id) {
      return None;
    }
    let (id, task) = self.definition.tasks.get_key_value(id)?;
    if !task.terminal {
      self.current = task.next.as_deref();
    }
    Some((id.as_str(), task))
  }
}
