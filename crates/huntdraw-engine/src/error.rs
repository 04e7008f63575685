use thiserror::Error;

/// Errors returned by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
  /// The definition failed the engine's schema check.
  #[error("invalid definition: {}", problems.join("; "))]
  InvalidDefinition { problems: Vec<String> },

  #[error("resource not found: {0}")]
  ResourceNotFound(String),

  #[error("resource already exists: {0}")]
  ResourceAlreadyExists(String),

  #[error("resource '{0}' is not active")]
  ResourceNotActive(String),

  #[error("execution not found: {0}")]
  ExecutionNotFound(String),
}

/// Failure reported by a task handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskError {
  pub message: String,
}

impl TaskError {
  pub fn new(message: impl std::fmt::Display) -> Self {
    Self {
      message: message.to_string(),
    }
  }
}
