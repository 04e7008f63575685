//! In-process execution engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use huntdraw_compiler::{TaskChainDefinition, TaskParameters};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{EngineError, TaskError};
use crate::schema::check_definition;
use crate::{ExecutionEngine, ExecutionStatus, ResourceStatus};

/// Everything a task handler gets for one invocation.
#[derive(Debug, Clone)]
pub struct TaskInvocation {
  pub node_id: String,
  /// The execution input (organization, workflow, instance and job ids).
  pub input: Value,
  pub parameters: TaskParameters,
  /// Previous task's output, or the start seed.
  pub previous: Value,
}

impl TaskInvocation {
  /// Resolve a `$.a.b` style path against the execution input.
  pub fn resolve_input(&self, path: &str) -> Option<&Value> {
    let rest = path.strip_prefix('$')?;
    rest
      .split('.')
      .filter(|segment| !segment.is_empty())
      .try_fold(&self.input, |value, segment| value.get(segment))
  }

  pub fn organization_id(&self) -> Option<&str> {
    self
      .resolve_input(&self.parameters.organization_id)
      .and_then(Value::as_str)
  }

  pub fn workflow_job_id(&self) -> Option<&str> {
    self
      .resolve_input(&self.parameters.workflow_job_id)
      .and_then(Value::as_str)
  }
}

/// Runs one kind of task.
#[async_trait]
pub trait TaskHandler: Send + Sync {
  async fn run(&self, invocation: TaskInvocation) -> Result<Value, TaskError>;
}

struct Resource {
  definition: TaskChainDefinition,
  /// Status polls left before the resource reports active.
  pending_polls: u32,
}

struct Execution {
  status: ExecutionStatus,
  output: Option<Value>,
}

#[derive(Default)]
struct State {
  resources: HashMap<String, Resource>,
  /// Kept until claimed with `take_execution_output`.
  executions: HashMap<String, Execution>,
}

/// An execution engine that runs task chains inside the current process.
///
/// Resources report `Creating` for a configurable number of status polls
/// after each create/update, then `Active`.
#[derive(Clone, Default)]
pub struct LocalExecutionEngine {
  state: Arc<Mutex<State>>,
  handlers: Arc<HashMap<String, Arc<dyn TaskHandler>>>,
  activation_polls: u32,
}

impl LocalExecutionEngine {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of `resource_status` calls answered with `Creating`.
  pub fn with_activation_polls(mut self, polls: u32) -> Self {
    self.activation_polls = polls;
    self
  }

  /// Register the handler for a resource reference.
  pub fn with_handler(
    mut self,
    resource_ref: impl Into<String>,
    handler: Arc<dyn TaskHandler>,
  ) -> Self {
    let mut handlers = (*self.handlers).clone();
    handlers.insert(resource_ref.into(), handler);
    self.handlers = Arc::new(handlers);
    self
  }

  /// Output of a finished execution, if it succeeded.
  pub async fn execution_output(&self, execution: &str) -> Option<Value> {
    let state = self.state.lock().await;
    state
      .executions
      .get(execution)
      .and_then(|e| e.output.clone())
  }

  /// Remove a finished execution and return its output.
  ///
  /// Running executions are left in place and yield `None`.
  pub async fn take_execution_output(&self, execution: &str) -> Option<Value> {
    let mut state = self.state.lock().await;
    if !state.executions.get(execution)?.status.is_finished() {
      return None;
    }
    state.executions.remove(execution).and_then(|e| e.output)
  }

  /// Poll an execution until it finishes.
  pub async fn wait_for_execution(
    &self,
    execution: &str,
    interval: Duration,
  ) -> Result<ExecutionStatus, EngineError> {
    loop {
      let status = self.execution_status(execution).await?;
      if status.is_finished() {
        return Ok(status);
      }
      tokio::time::sleep(interval).await;
    }
  }
}

#[async_trait]
impl ExecutionEngine for LocalExecutionEngine {
  async fn validate_definition(&self, definition: &TaskChainDefinition) -> Result<(), EngineError> {
    let problems = check_definition(definition);
    if problems.is_empty() {
      Ok(())
    } else {
      Err(EngineError::InvalidDefinition { problems })
    }
  }

  async fn create_resource(
    &self,
    name: &str,
    definition: &TaskChainDefinition,
  ) -> Result<String, EngineError> {
    self.validate_definition(definition).await?;

    let handle = format!("local:resource:{}", name);
    let mut state = self.state.lock().await;
    if state.resources.contains_key(&handle) {
      return Err(EngineError::ResourceAlreadyExists(handle));
    }
    state.resources.insert(
      handle.clone(),
      Resource {
        definition: definition.clone(),
        pending_polls: self.activation_polls,
      },
    );

    info!(%handle, "created resource");
    Ok(handle)
  }

  async fn update_resource(
    &self,
    handle: &str,
    definition: &TaskChainDefinition,
  ) -> Result<(), EngineError> {
    self.validate_definition(definition).await?;

    let mut state = self.state.lock().await;
    let resource = state
      .resources
      .get_mut(handle)
      .ok_or_else(|| EngineError::ResourceNotFound(handle.to_string()))?;
    resource.definition = definition.clone();
    resource.pending_polls = self.activation_polls;

    info!(%handle, "updated resource");
    Ok(())
  }

  async fn resource_status(&self, handle: &str) -> Result<ResourceStatus, EngineError> {
    let mut state = self.state.lock().await;
    let resource = state
      .resources
      .get_mut(handle)
      .ok_or_else(|| EngineError::ResourceNotFound(handle.to_string()))?;

    if resource.pending_polls > 0 {
      resource.pending_polls -= 1;
      Ok(ResourceStatus::Creating)
    } else {
      Ok(ResourceStatus::Active)
    }
  }

  async fn start_execution(&self, handle: &str, input: Value) -> Result<String, EngineError> {
    let definition = {
      let state = self.state.lock().await;
      let resource = state
        .resources
        .get(handle)
        .ok_or_else(|| EngineError::ResourceNotFound(handle.to_string()))?;
      if resource.pending_polls > 0 {
        return Err(EngineError::ResourceNotActive(handle.to_string()));
      }
      resource.definition.clone()
    };

    let execution_id = format!("{}:execution:{}", handle, uuid::Uuid::new_v4());
    {
      let mut state = self.state.lock().await;
      state.executions.insert(
        execution_id.clone(),
        Execution {
          status: ExecutionStatus::Running,
          output: None,
        },
      );
    }

    let state = Arc::clone(&self.state);
    let handlers = Arc::clone(&self.handlers);
    let id = execution_id.clone();
    tokio::spawn(async move {
      let result = run_chain(&definition, input, &handlers).await;
      let mut state = state.lock().await;
      if let Some(execution) = state.executions.get_mut(&id) {
        match result {
          Ok(output) => {
            info!(execution = %id, "execution succeeded");
            execution.status = ExecutionStatus::Succeeded;
            execution.output = Some(output);
          }
          Err(error) => {
            warn!(execution = %id, %error, "execution failed");
            execution.status = ExecutionStatus::Failed {
              error: error.to_string(),
            };
          }
        }
      }
    });

    Ok(execution_id)
  }

  async fn execution_status(&self, execution: &str) -> Result<ExecutionStatus, EngineError> {
    let state = self.state.lock().await;
    state
      .executions
      .get(execution)
      .map(|e| e.status.clone())
      .ok_or_else(|| EngineError::ExecutionNotFound(execution.to_string()))
  }
}

/// Walk the chain, feeding each task the previous task's output.
async fn run_chain(
  definition: &TaskChainDefinition,
  input: Value,
  handlers: &HashMap<String, Arc<dyn TaskHandler>>,
) -> Result<Value, TaskError> {
  let mut results: Map<String, Value> = Map::new();
  let mut last = Value::Null;

  for (node_id, task) in definition.chain() {
    let handler = handlers.get(&task.resource_ref).ok_or_else(|| {
      TaskError::new(format!(
        "no handler for resource '{}' (node '{}')",
        task.resource_ref, node_id
      ))
    })?;

    let previous = match &task.parameters.previous_node_id {
      Some(prev) => results.get(prev).cloned().unwrap_or(Value::Null),
      None => task.parameters.seed.clone().unwrap_or_else(|| json!({})),
    };

    debug!(node_id, resource = %task.resource_ref, "running task");
    let output = handler
      .run(TaskInvocation {
        node_id: node_id.to_string(),
        input: input.clone(),
        parameters: task.parameters.clone(),
        previous,
      })
      .await
      .map_err(|e| TaskError::new(format!("task '{}' failed: {}", node_id, e)))?;

    results.insert(node_id.to_string(), output.clone());
    last = output;
  }

  Ok(last)
}
