use thiserror::Error;

/// Errors raised by a draw run.
///
/// Semantic errors (`MissingSortRules`, `MissingConfig`) are raised before
/// any allocation state is touched.
#[derive(Debug, Error)]
pub enum DrawError {
  #[error("draw sort has no rules")]
  MissingSortRules,

  #[error("draw config is missing")]
  MissingConfig,

  #[error("missing draw input: {0}")]
  MissingInput(&'static str),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("artifact error: {0}")]
  Artifact(#[from] huntdraw_artifact::Error),

  #[error("draw computation panicked: {0}")]
  Join(#[from] tokio::task::JoinError),
}
