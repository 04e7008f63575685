//! Error types for the build pipeline.

use std::time::Duration;

use huntdraw_compiler::CompileError;
use huntdraw_engine::EngineError;
use huntdraw_store::InstanceStatus;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur during a build stage.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The workflow graph could not be compiled.
  #[error("compile failed: {0}")]
  Compile(#[from] CompileError),

  /// The execution engine's schema check rejected the compiled definition.
  #[error("definition rejected by execution engine: {}", problems.join("; "))]
  DefinitionRejected { problems: Vec<String> },

  #[error("entity store error: {0}")]
  Store(#[from] huntdraw_store::Error),

  #[error("blob store error: {0}")]
  Artifact(#[from] huntdraw_artifact::Error),

  #[error("execution engine error: {0}")]
  Engine(#[source] EngineError),

  #[error("workflow instance '{instance_id}' has no compiled definition")]
  MissingDefinition { instance_id: String },

  #[error("workflow instance '{instance_id}' has not been registered")]
  MissingExecutionHandle { instance_id: String },

  #[error("workflow instance '{instance_id}' is not ready (status {status:?})")]
  InstanceNotReady {
    instance_id: String,
    status: InstanceStatus,
  },

  #[error("workflow instance '{instance_id}' already failed to build")]
  InstanceBuildFailed { instance_id: String },

  #[error("resource '{handle}' failed to become active")]
  ResourceFailed { handle: String },

  #[error("resource '{handle}' not active after {}ms", waited.as_millis())]
  Timeout { handle: String, waited: Duration },

  #[error("build cancelled")]
  Cancelled,
}

impl From<EngineError> for BuildError {
  fn from(err: EngineError) -> Self {
    match err {
      EngineError::InvalidDefinition { problems } => BuildError::DefinitionRejected { problems },
      other => BuildError::Engine(other),
    }
  }
}

impl BuildError {
  /// Message key and structured parameters for loggable errors.
  ///
  /// Returns `None` for errors that only surface through the returned error.
  pub fn log_entry(&self) -> Option<(&'static str, Value)> {
    match self {
      BuildError::Compile(err) => Some((err.message_key(), Value::Object(err.params()))),
      BuildError::DefinitionRejected { problems } => {
        Some(("DefinitionRejected", json!({ "problems": problems })))
      }
      BuildError::Timeout { handle, waited } => Some((
        "Timeout",
        json!({ "handle": handle, "waitedMs": waited.as_millis() as u64 }),
      )),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_compile_errors_are_loggable() {
    let err = BuildError::from(CompileError::CycleDetected {
      node_id: "B".to_string(),
    });
    let (key, params) = err.log_entry().unwrap();
    assert_eq!(key, "CycleDetected");
    assert_eq!(params, json!({ "nodeId": "B" }));
  }

  #[test]
  fn test_invalid_definition_maps_to_rejection() {
    let err = BuildError::from(EngineError::InvalidDefinition {
      problems: vec!["x".to_string()],
    });
    assert!(matches!(err, BuildError::DefinitionRejected { .. }));
    assert_eq!(err.log_entry().unwrap().0, "DefinitionRejected");
  }

  #[test]
  fn test_infrastructure_errors_are_not_loggable() {
    let err = BuildError::from(huntdraw_store::Error::NotFound("x".to_string()));
    assert!(err.log_entry().is_none());
    assert!(BuildError::Cancelled.log_entry().is_none());
  }
}
