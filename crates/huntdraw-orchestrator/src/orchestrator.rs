use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use huntdraw_artifact::{Store as BlobStore, get_json, put_json};
use huntdraw_compiler::{TaskChainCompiler, TaskChainDefinition};
use huntdraw_engine::{ExecutionEngine, ResourceStatus};
use huntdraw_store::{EntityStore, Error as StoreError, InstanceStatus, JobLog, WorkflowInstance};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::context::BuildContext;
use crate::error::BuildError;

/// A stage of the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Compile,
  Register,
  AwaitReady,
  Trigger,
}

impl Stage {
  fn as_str(&self) -> &'static str {
    match self {
      Stage::Compile => "compile",
      Stage::Register => "register",
      Stage::AwaitReady => "await_ready",
      Stage::Trigger => "trigger",
    }
  }

  /// Whether a failure in this stage fails the instance build.
  fn fails_build(&self) -> bool {
    !matches!(self, Stage::Trigger)
  }
}

/// Result of running every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
  pub definition_ref: String,
  pub resource_handle: String,
  pub execution_handle: Option<String>,
}

/// Drives workflow instances through compile, register, await-ready and
/// trigger.
pub struct BuildOrchestrator {
  store: Arc<dyn EntityStore>,
  blobs: Arc<dyn BlobStore>,
  engine: Arc<dyn ExecutionEngine>,
  compiler: TaskChainCompiler,
  config: OrchestratorConfig,
}

impl BuildOrchestrator {
  pub fn new(
    store: Arc<dyn EntityStore>,
    blobs: Arc<dyn BlobStore>,
    engine: Arc<dyn ExecutionEngine>,
    compiler: TaskChainCompiler,
    config: OrchestratorConfig,
  ) -> Self {
    Self {
      store,
      blobs,
      engine,
      compiler,
      config,
    }
  }

  /// Run all four stages in order.
  pub async fn build(
    &self,
    ctx: &BuildContext,
    cancel: &CancellationToken,
  ) -> Result<BuildOutcome, BuildError> {
    let definition_ref = self.compile(ctx).await?;
    let resource_handle = self.register(ctx).await?;
    self.await_ready(ctx, cancel).await?;
    let execution_handle = self.trigger(ctx).await?;

    Ok(BuildOutcome {
      definition_ref,
      resource_handle,
      execution_handle,
    })
  }

  /// Compile the instance's graph and store the definition.
  ///
  /// Returns the blob key of the stored definition.
  pub async fn compile(&self, ctx: &BuildContext) -> Result<String, BuildError> {
    self
      .guarded(Stage::Compile, ctx, self.run_compile(ctx))
      .await
  }

  /// Register the stored definition with the execution engine.
  ///
  /// Creates a resource on first call and updates it in place afterwards.
  /// Returns the resource handle.
  pub async fn register(&self, ctx: &BuildContext) -> Result<String, BuildError> {
    self
      .guarded(Stage::Register, ctx, self.run_register(ctx))
      .await
  }

  /// Poll the registered resource until it is active, then mark the
  /// instance `Ready`.
  pub async fn await_ready(
    &self,
    ctx: &BuildContext,
    cancel: &CancellationToken,
  ) -> Result<(), BuildError> {
    self
      .guarded(Stage::AwaitReady, ctx, self.run_await_ready(ctx, cancel))
      .await
  }

  /// Start an execution for the job in scope.
  ///
  /// Does nothing when the context carries no job. Returns the execution
  /// handle recorded on the job.
  pub async fn trigger(&self, ctx: &BuildContext) -> Result<Option<String>, BuildError> {
    let Some(job_id) = ctx.workflow_job_id.as_deref() else {
      return Ok(None);
    };

    self
      .guarded(Stage::Trigger, ctx, self.run_trigger(ctx, job_id))
      .await
  }

  async fn run_compile(&self, ctx: &BuildContext) -> Result<String, BuildError> {
    let mut instance = self.load_instance(ctx).await?;
    ensure_buildable(&instance)?;
    self
      .set_status(&mut instance, InstanceStatus::BuildStarted)
      .await?;

    let nodes = self.store.list_nodes(&instance.id).await?;
    let edges = self.store.list_edges(&instance.id).await?;

    let mut documents = Vec::new();
    for document_id in nodes.iter().filter_map(|n| n.document_id.as_deref()) {
      match self.store.get_document(document_id).await {
        Ok(document) => documents.push(document),
        // Reported by the compiler as a data node without a document.
        Err(StoreError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
      }
    }

    let definition = self.compiler.compile(&nodes, &edges, &documents)?;
    self.engine.validate_definition(&definition).await?;

    let key = self.definition_key(ctx);
    put_json(self.blobs.as_ref(), &key, &definition).await?;

    instance.definition_ref = Some(key.clone());
    instance.updated_at = Utc::now();
    self.store.save_instance(&instance).await?;

    info!(instance_id = %instance.id, tasks = definition.len(), %key, "compiled workflow");
    Ok(key)
  }

  async fn run_register(&self, ctx: &BuildContext) -> Result<String, BuildError> {
    let mut instance = self.load_instance(ctx).await?;
    ensure_buildable(&instance)?;
    let key = instance
      .definition_ref
      .clone()
      .ok_or_else(|| BuildError::MissingDefinition {
        instance_id: instance.id.clone(),
      })?;
    let definition: TaskChainDefinition = get_json(self.blobs.as_ref(), &key).await?;

    let handle = match instance.execution_handle_ref.clone() {
      Some(handle) => {
        self.engine.update_resource(&handle, &definition).await?;
        info!(instance_id = %instance.id, %handle, "updated resource");
        handle
      }
      None => {
        let name = format!("{}-{}", ctx.workflow_id, instance.id);
        let handle = self.engine.create_resource(&name, &definition).await?;
        instance.execution_handle_ref = Some(handle.clone());
        instance.updated_at = Utc::now();
        self.store.save_instance(&instance).await?;
        info!(instance_id = %instance.id, %handle, "created resource");
        handle
      }
    };

    Ok(handle)
  }

  async fn run_await_ready(
    &self,
    ctx: &BuildContext,
    cancel: &CancellationToken,
  ) -> Result<(), BuildError> {
    let instance = self.load_instance(ctx).await?;
    ensure_buildable(&instance)?;
    let handle = self.registered_handle(&instance)?;

    let started = Instant::now();
    loop {
      match self.engine.resource_status(&handle).await? {
        ResourceStatus::Active => break,
        ResourceStatus::Failed => return Err(BuildError::ResourceFailed { handle }),
        ResourceStatus::Creating => {}
      }

      let waited = started.elapsed();
      if waited >= self.config.max_wait {
        return Err(BuildError::Timeout { handle, waited });
      }

      debug!(%handle, waited_ms = waited.as_millis() as u64, "resource not active yet");
      tokio::select! {
        _ = cancel.cancelled() => return Err(BuildError::Cancelled),
        _ = tokio::time::sleep(self.config.poll_interval) => {}
      }
    }

    // Re-read: register may have saved the instance while we polled.
    let mut instance = self.load_instance(ctx).await?;
    ensure_buildable(&instance)?;
    self.set_status(&mut instance, InstanceStatus::Ready).await?;

    info!(instance_id = %instance.id, %handle, "workflow instance ready");
    Ok(())
  }

  async fn run_trigger(&self, ctx: &BuildContext, job_id: &str) -> Result<Option<String>, BuildError> {
    let instance = self.load_instance(ctx).await?;
    if instance.status != InstanceStatus::Ready {
      return Err(BuildError::InstanceNotReady {
        instance_id: instance.id.clone(),
        status: instance.status,
      });
    }
    let handle = self.registered_handle(&instance)?;

    let execution = self
      .engine
      .start_execution(&handle, ctx.execution_input())
      .await?;

    let mut job = self.store.get_job(job_id).await?;
    job.execution_handle_ref = Some(execution.clone());
    self.store.save_job(&job).await?;

    info!(instance_id = %instance.id, job_id, %execution, "started execution");
    Ok(Some(execution))
  }

  /// Run a stage body and apply the shared failure handling to its error.
  async fn guarded<T, F>(&self, stage: Stage, ctx: &BuildContext, work: F) -> Result<T, BuildError>
  where
    F: Future<Output = Result<T, BuildError>>,
  {
    match work.await {
      Ok(value) => Ok(value),
      Err(err) => {
        warn!(
          stage = stage.as_str(),
          instance_id = %ctx.workflow_instance_id,
          error = %err,
          "build stage failed"
        );
        self.record_failure(stage, ctx, &err).await;
        Err(err)
      }
    }
  }

  /// Best-effort failure bookkeeping. Errors here are logged, never raised,
  /// so the original error reaches the caller.
  async fn record_failure(&self, stage: Stage, ctx: &BuildContext, err: &BuildError) {
    if stage.fails_build() {
      match self.store.get_instance(&ctx.workflow_instance_id).await {
        Ok(mut instance) => {
          if let Err(e) = self
            .set_status(&mut instance, InstanceStatus::BuildFailed)
            .await
          {
            warn!(error = %e, "failed to mark instance as build failed");
          }
        }
        Err(e) => warn!(error = %e, "failed to load instance to mark build failed"),
      }
    }

    let Some(job_id) = ctx.workflow_job_id.as_deref() else {
      return;
    };

    if let Some((message_key, params)) = err.log_entry() {
      let log = JobLog::new(job_id, message_key, params);
      if let Err(e) = self.store.append_job_log(&log).await {
        warn!(job_id, error = %e, "failed to append job log");
      }
    }

    match self.store.get_job(job_id).await {
      Ok(mut job) => {
        job.pre_execution_failure = Some(true);
        if let Err(e) = self.store.save_job(&job).await {
          warn!(job_id, error = %e, "failed to flag job as pre-execution failure");
        }
      }
      Err(e) => warn!(job_id, error = %e, "failed to load job to flag failure"),
    }
  }

  async fn load_instance(&self, ctx: &BuildContext) -> Result<WorkflowInstance, BuildError> {
    Ok(self.store.get_instance(&ctx.workflow_instance_id).await?)
  }

  async fn set_status(
    &self,
    instance: &mut WorkflowInstance,
    status: InstanceStatus,
  ) -> Result<(), StoreError> {
    instance.status = status;
    instance.updated_at = Utc::now();
    self.store.save_instance(instance).await
  }

  fn registered_handle(&self, instance: &WorkflowInstance) -> Result<String, BuildError> {
    instance
      .execution_handle_ref
      .clone()
      .ok_or_else(|| BuildError::MissingExecutionHandle {
        instance_id: instance.id.clone(),
      })
  }

  fn definition_key(&self, ctx: &BuildContext) -> String {
    format!(
      "{}/{}/{}/{}/definition.json",
      self.config.definition_prefix,
      ctx.organization_id,
      ctx.workflow_id,
      ctx.workflow_instance_id
    )
  }
}

/// `BuildFailed` is terminal; a retry needs a new instance.
fn ensure_buildable(instance: &WorkflowInstance) -> Result<(), BuildError> {
  if instance.status == InstanceStatus::BuildFailed {
    return Err(BuildError::InstanceBuildFailed {
      instance_id: instance.id.clone(),
    });
  }
  Ok(())
}
