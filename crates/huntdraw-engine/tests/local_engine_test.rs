//! Integration tests for LocalExecutionEngine running compiled chains.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use huntdraw_compiler::{ResourceRegistry, TaskChainCompiler, TaskChainDefinition};
use huntdraw_config::{EdgeRecord, NodeRecord, TaskKind};
use huntdraw_engine::{
  EngineError, ExecutionEngine, ExecutionStatus, LocalExecutionEngine, ResourceStatus,
  TaskError, TaskHandler, TaskInvocation,
};
use serde_json::{Value, json};

/// Appends its node id to the list carried in the previous output.
struct TraceHandler;

#[async_trait]
impl TaskHandler for TraceHandler {
  async fn run(&self, invocation: TaskInvocation) -> Result<Value, TaskError> {
    let mut trail: Vec<Value> = invocation
      .previous
      .get("trail")
      .and_then(Value::as_array)
      .cloned()
      .unwrap_or_default();
    trail.push(json!(invocation.node_id));
    Ok(json!({
      "trail": trail,
      "organizationId": invocation.organization_id(),
      "workflowJobId": invocation.workflow_job_id(),
    }))
  }
}

struct FailingHandler;

#[async_trait]
impl TaskHandler for FailingHandler {
  async fn run(&self, _invocation: TaskInvocation) -> Result<Value, TaskError> {
    Err(TaskError::new("boom"))
  }
}

fn chain(kinds: &[(&str, &str)]) -> TaskChainDefinition {
  let nodes: Vec<NodeRecord> = kinds.iter().map(|(id, t)| NodeRecord::new(*id, *t)).collect();
  let edges: Vec<EdgeRecord> = kinds
    .windows(2)
    .map(|w| EdgeRecord::new(format!("{}-{}", w[0].0, w[1].0), w[0].0, w[1].0))
    .collect();
  TaskChainCompiler::new(ResourceRegistry::local())
    .compile(&nodes, &edges, &[])
    .expect("chain should compile")
}

async fn poll_active(engine: &LocalExecutionEngine, handle: &str) -> u32 {
  let mut polls = 0;
  loop {
    polls += 1;
    if engine.resource_status(handle).await.unwrap() == ResourceStatus::Active {
      return polls;
    }
  }
}

#[tokio::test]
async fn test_runs_chain_in_order() {
  let engine = LocalExecutionEngine::new()
    .with_activation_polls(2)
    .with_handler(format!("local:{}", TaskKind::HuntCodeImport), Arc::new(TraceHandler))
    .with_handler(format!("local:{}", TaskKind::Draw), Arc::new(TraceHandler));

  let def = chain(&[("import", "hunt_code_import"), ("draw", "draw")]);
  let handle = engine.create_resource("wf-1", &def).await.unwrap();
  assert_eq!(poll_active(&engine, &handle).await, 3);

  let execution = engine
    .start_execution(
      &handle,
      json!({ "organizationId": "org-9", "workflowJobId": "job-3" }),
    )
    .await
    .unwrap();
  let status = engine
    .wait_for_execution(&execution, Duration::from_millis(5))
    .await
    .unwrap();
  assert_eq!(status, ExecutionStatus::Succeeded);

  let output = engine.execution_output(&execution).await.unwrap();
  assert_eq!(output["trail"], json!(["import", "draw"]));
  assert_eq!(output["organizationId"], json!("org-9"));
  assert_eq!(output["workflowJobId"], json!("job-3"));

  assert_eq!(engine.take_execution_output(&execution).await, Some(output));
  assert!(engine.execution_output(&execution).await.is_none());
  assert!(matches!(
    engine.execution_status(&execution).await,
    Err(EngineError::ExecutionNotFound(_))
  ));
}

#[tokio::test]
async fn test_start_before_active_is_rejected() {
  let engine = LocalExecutionEngine::new().with_activation_polls(1);
  let def = chain(&[("draw", "draw")]);
  let handle = engine.create_resource("wf", &def).await.unwrap();

  let err = engine.start_execution(&handle, json!({})).await.unwrap_err();
  assert_eq!(err, EngineError::ResourceNotActive(handle));
}

#[tokio::test]
async fn test_create_twice_conflicts_and_update_resets_activation() {
  let engine = LocalExecutionEngine::new().with_activation_polls(1);
  let def = chain(&[("draw", "draw")]);
  let handle = engine.create_resource("wf", &def).await.unwrap();

  assert!(matches!(
    engine.create_resource("wf", &def).await,
    Err(EngineError::ResourceAlreadyExists(_))
  ));

  poll_active(&engine, &handle).await;
  engine.update_resource(&handle, &def).await.unwrap();
  assert_eq!(
    engine.resource_status(&handle).await.unwrap(),
    ResourceStatus::Creating
  );
}

#[tokio::test]
async fn test_missing_handler_fails_execution() {
  let engine = LocalExecutionEngine::new();
  let def = chain(&[("draw", "draw")]);
  let handle = engine.create_resource("wf", &def).await.unwrap();

  let execution = engine.start_execution(&handle, json!({})).await.unwrap();
  let status = engine
    .wait_for_execution(&execution, Duration::from_millis(5))
    .await
    .unwrap();
  assert!(matches!(status, ExecutionStatus::Failed { ref error } if error.contains("no handler")));
}

#[tokio::test]
async fn test_task_failure_names_node() {
  let engine = LocalExecutionEngine::new()
    .with_handler("local:draw", Arc::new(FailingHandler));
  let def = chain(&[("the-draw", "draw")]);
  let handle = engine.create_resource("wf", &def).await.unwrap();

  let execution = engine.start_execution(&handle, json!({})).await.unwrap();
  let status = engine
    .wait_for_execution(&execution, Duration::from_millis(5))
    .await
    .unwrap();
  assert_eq!(
    status,
    ExecutionStatus::Failed {
      error: "task 'the-draw' failed: boom".to_string()
    }
  );
  assert!(engine.execution_output(&execution).await.is_none());
}

#[tokio::test]
async fn test_validate_rejects_broken_definition() {
  let engine = LocalExecutionEngine::new();
  let mut def = chain(&[("a", "draw"), ("b", "draw")]);
  if let Some(task) = def.tasks.get_mut("a") {
    task.next = Some("ghost".to_string());
  }

  let err = engine.validate_definition(&def).await.unwrap_err();
  assert!(matches!(err, EngineError::InvalidDefinition { .. }));
  assert!(matches!(
    engine.create_resource("wf", &def).await,
    Err(EngineError::InvalidDefinition { .. })
  ));
}
