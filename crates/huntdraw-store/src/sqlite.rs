use async_trait::async_trait;
use huntdraw_config::{DocumentRecord, EdgeRecord, GraphDef, NodeRecord};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{EntityStore, Error, JobLog, WorkflowInstance, WorkflowJob};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if missing) the database at `url` and run migrations.
  pub async fn connect(url: &str) -> Result<Self, Error> {
    let options = url
      .parse::<SqliteConnectOptions>()?
      .create_if_missing(true);
    // In-memory databases are per connection, so keep a single one.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
      .max_connections(max_connections)
      .connect_with(options)
      .await?;

    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

fn not_found(what: String) -> impl FnOnce(sqlx::Error) -> Error {
  move |e| match e {
    sqlx::Error::RowNotFound => Error::NotFound(what),
    other => Error::Database(other),
  }
}

#[async_trait]
impl EntityStore for SqliteStore {
  async fn get_instance(&self, instance_id: &str) -> Result<WorkflowInstance, Error> {
    sqlx::query_as(
      r#"
      SELECT id, workflow_id, organization_id, status, definition_ref, execution_handle_ref,
             created_at, updated_at
      FROM workflow_instances
      WHERE id = ?
      "#,
    )
    .bind(instance_id)
    .fetch_one(&self.pool)
    .await
    .map_err(not_found(format!("workflow instance {}", instance_id)))
  }

  async fn save_instance(&self, instance: &WorkflowInstance) -> Result<(), Error> {
    sqlx::query(
      r#"
      INSERT INTO workflow_instances
        (id, workflow_id, organization_id, status, definition_ref, execution_handle_ref,
         created_at, updated_at)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?)
      ON CONFLICT (id) DO UPDATE SET
        status = excluded.status,
        definition_ref = excluded.definition_ref,
        execution_handle_ref = excluded.execution_handle_ref,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(&instance.id)
    .bind(&instance.workflow_id)
    .bind(&instance.organization_id)
    .bind(instance.status)
    .bind(&instance.definition_ref)
    .bind(&instance.execution_handle_ref)
    .bind(instance.created_at)
    .bind(instance.updated_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get_job(&self, job_id: &str) -> Result<WorkflowJob, Error> {
    sqlx::query_as(
      r#"
      SELECT id, workflow_instance_id, execution_handle_ref, pre_execution_failure, created_at
      FROM workflow_jobs
      WHERE id = ?
      "#,
    )
    .bind(job_id)
    .fetch_one(&self.pool)
    .await
    .map_err(not_found(format!("workflow job {}", job_id)))
  }

  async fn save_job(&self, job: &WorkflowJob) -> Result<(), Error> {
    sqlx::query(
      r#"
      INSERT INTO workflow_jobs
        (id, workflow_instance_id, execution_handle_ref, pre_execution_failure, created_at)
      VALUES (?, ?, ?, ?, ?)
      ON CONFLICT (id) DO UPDATE SET
        execution_handle_ref = excluded.execution_handle_ref,
        pre_execution_failure = excluded.pre_execution_failure
      "#,
    )
    .bind(&job.id)
    .bind(&job.workflow_instance_id)
    .bind(&job.execution_handle_ref)
    .bind(job.pre_execution_failure)
    .bind(job.created_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn append_job_log(&self, log: &JobLog) -> Result<(), Error> {
    sqlx::query(
      r#"
      INSERT INTO workflow_job_logs (id, workflow_job_id, message_key, params, created_at)
      VALUES (?, ?, ?, ?, ?)
      "#,
    )
    .bind(&log.id)
    .bind(&log.workflow_job_id)
    .bind(&log.message_key)
    .bind(&log.params)
    .bind(log.created_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn list_job_logs(&self, job_id: &str) -> Result<Vec<JobLog>, Error> {
    let logs = sqlx::query_as(
      r#"
      SELECT id, workflow_job_id, message_key, params, created_at
      FROM workflow_job_logs
      WHERE workflow_job_id = ?
      ORDER BY rowid ASC
      "#,
    )
    .bind(job_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(logs)
  }

  async fn list_nodes(&self, instance_id: &str) -> Result<Vec<NodeRecord>, Error> {
    let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
      r#"
      SELECT id, node_type, document_id
      FROM workflow_nodes
      WHERE workflow_instance_id = ?
      ORDER BY position ASC
      "#,
    )
    .bind(instance_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(id, node_type, document_id)| NodeRecord {
          id,
          node_type,
          document_id,
        })
        .collect(),
    )
  }

  async fn list_edges(&self, instance_id: &str) -> Result<Vec<EdgeRecord>, Error> {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
      r#"
      SELECT id, source, target
      FROM workflow_edges
      WHERE workflow_instance_id = ?
      ORDER BY position ASC
      "#,
    )
    .bind(instance_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(id, source, target)| EdgeRecord { id, source, target })
        .collect(),
    )
  }

  async fn save_graph(&self, instance_id: &str, graph: &GraphDef) -> Result<(), Error> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM workflow_nodes WHERE workflow_instance_id = ?")
      .bind(instance_id)
      .execute(&mut *tx)
      .await?;
    sqlx::query("DELETE FROM workflow_edges WHERE workflow_instance_id = ?")
      .bind(instance_id)
      .execute(&mut *tx)
      .await?;

    for (position, node) in graph.nodes.iter().enumerate() {
      sqlx::query(
        r#"
        INSERT INTO workflow_nodes (workflow_instance_id, id, node_type, document_id, position)
        VALUES (?, ?, ?, ?, ?)
        "#,
      )
      .bind(instance_id)
      .bind(&node.id)
      .bind(&node.node_type)
      .bind(&node.document_id)
      .bind(position as i64)
      .execute(&mut *tx)
      .await?;
    }

    for (position, edge) in graph.edges.iter().enumerate() {
      sqlx::query(
        r#"
        INSERT INTO workflow_edges (workflow_instance_id, id, source, target, position)
        VALUES (?, ?, ?, ?, ?)
        "#,
      )
      .bind(instance_id)
      .bind(&edge.id)
      .bind(&edge.source)
      .bind(&edge.target)
      .bind(position as i64)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;

    for document in &graph.documents {
      self.save_document(document).await?;
    }

    Ok(())
  }

  async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, Error> {
    let (id, key, content_type): (String, String, String) = sqlx::query_as(
      r#"
      SELECT id, key, content_type
      FROM documents
      WHERE id = ?
      "#,
    )
    .bind(document_id)
    .fetch_one(&self.pool)
    .await
    .map_err(not_found(format!("document {}", document_id)))?;

    Ok(DocumentRecord {
      id,
      key,
      content_type,
    })
  }

  async fn save_document(&self, document: &DocumentRecord) -> Result<(), Error> {
    sqlx::query(
      r#"
      INSERT INTO documents (id, key, content_type)
      VALUES (?, ?, ?)
      ON CONFLICT (id) DO UPDATE SET
        key = excluded.key,
        content_type = excluded.content_type
      "#,
    )
    .bind(&document.id)
    .bind(&document.key)
    .bind(&document.content_type)
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}
