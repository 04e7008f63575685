//! Huntdraw Store
//!
//! This crate provides the entity-store port the build orchestrator talks to,
//! plus two implementations: an in-memory store for tests and local runs, and
//! a SQLite store.
//!
//! The [`EntityStore`] trait defines operations for:
//! - Reading and writing workflow instances and jobs
//! - Appending structured job log rows
//! - Loading the node/edge/document records of a workflow instance

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{InstanceStatus, JobLog, WorkflowInstance, WorkflowJob};

use async_trait::async_trait;
use huntdraw_config::{DocumentRecord, EdgeRecord, GraphDef, NodeRecord};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Storage trait for workflow instances, jobs and graph records.
#[async_trait]
pub trait EntityStore: Send + Sync {
  /// Get a workflow instance by ID.
  async fn get_instance(&self, instance_id: &str) -> Result<WorkflowInstance, Error>;

  /// Create or overwrite a workflow instance.
  async fn save_instance(&self, instance: &WorkflowInstance) -> Result<(), Error>;

  /// Get a workflow job by ID.
  async fn get_job(&self, job_id: &str) -> Result<WorkflowJob, Error>;

  /// Create or overwrite a workflow job.
  async fn save_job(&self, job: &WorkflowJob) -> Result<(), Error>;

  /// Append a log row to a job. Rows are never updated.
  async fn append_job_log(&self, log: &JobLog) -> Result<(), Error>;

  /// List a job's log rows in insertion order.
  async fn list_job_logs(&self, job_id: &str) -> Result<Vec<JobLog>, Error>;

  /// List the nodes of a workflow instance in stored order.
  async fn list_nodes(&self, instance_id: &str) -> Result<Vec<NodeRecord>, Error>;

  /// List the edges of a workflow instance in stored order.
  async fn list_edges(&self, instance_id: &str) -> Result<Vec<EdgeRecord>, Error>;

  /// Replace the node and edge records of a workflow instance.
  async fn save_graph(&self, instance_id: &str, graph: &GraphDef) -> Result<(), Error>;

  /// Get document metadata by ID.
  async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, Error>;

  /// Create or overwrite document metadata.
  async fn save_document(&self, document: &DocumentRecord) -> Result<(), Error>;
}
