//! Huntdraw Orchestrator
//!
//! Drives a workflow instance from `BuildNeeded` to `Ready` and starts jobs
//! against it.
//!
//! # Stages
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐   ┌──────────┐
//! │ compile  │──▶│ register │──▶│ await-ready │──▶│ trigger  │
//! └──────────┘   └──────────┘   └─────────────┘   └──────────┘
//!  graph → def    create or      poll resource     start job
//!  stored blob    update          until active     execution
//! ```
//!
//! Each stage can be invoked on its own and tolerates being retried:
//! compile overwrites the same blob key, and register creates or updates
//! depending on whether a handle has been stored.
//!
//! Failures are handled the same way in every stage. Compile, register and
//! await-ready move the instance to `BuildFailed`. When a job is in scope,
//! loggable errors are written as structured job log rows and the job is
//! flagged as a pre-execution failure. The error is then returned.

mod config;
mod context;
mod error;
mod orchestrator;

pub use config::OrchestratorConfig;
pub use context::BuildContext;
pub use error::BuildError;
pub use orchestrator::{BuildOrchestrator, BuildOutcome, Stage};
