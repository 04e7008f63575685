//! Huntdraw Engine
//!
//! The managed execution engine is an external, declarative task-chain
//! runner. This crate defines the narrow port the build orchestrator needs
//! from it ([`ExecutionEngine`]), the engine's own definition checker, and
//! [`LocalExecutionEngine`], an in-process implementation that runs chains by
//! dispatching each task's resource reference to a registered
//! [`TaskHandler`].
//!
//! # Lifecycle
//!
//! ```text
//! validate_definition ─▶ create_resource / update_resource
//!                                 │
//!                                 ▼
//!                        resource_status (poll until Active)
//!                                 │
//!                                 ▼
//!                        start_execution ─▶ execution_status
//! ```

mod error;
mod local;
mod schema;

pub use error::{EngineError, TaskError};
pub use local::{LocalExecutionEngine, TaskHandler, TaskInvocation};
pub use schema::check_definition;

use async_trait::async_trait;
use huntdraw_compiler::TaskChainDefinition;
use serde::{Deserialize, Serialize};

/// Readiness of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
  Creating,
  Active,
  Failed,
}

/// Status of one execution of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionStatus {
  Running,
  Succeeded,
  Failed { error: String },
}

impl ExecutionStatus {
  pub fn is_finished(&self) -> bool {
    !matches!(self, ExecutionStatus::Running)
  }
}

/// Port onto the managed execution engine.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
  /// Check a definition against the engine's own schema.
  async fn validate_definition(&self, definition: &TaskChainDefinition) -> Result<(), EngineError>;

  /// Register a new named resource and return its handle.
  async fn create_resource(
    &self,
    name: &str,
    definition: &TaskChainDefinition,
  ) -> Result<String, EngineError>;

  /// Replace the definition of an existing resource in place.
  async fn update_resource(
    &self,
    handle: &str,
    definition: &TaskChainDefinition,
  ) -> Result<(), EngineError>;

  async fn resource_status(&self, handle: &str) -> Result<ResourceStatus, EngineError>;

  /// Start an execution of a resource and return the execution handle.
  async fn start_execution(
    &self,
    handle: &str,
    input: serde_json::Value,
  ) -> Result<String, EngineError>;

  async fn execution_status(&self, execution: &str) -> Result<ExecutionStatus, EngineError>;
}
