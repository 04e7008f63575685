//! Integration tests for SqliteStore against an in-memory database.

use huntdraw_config::{DocumentRecord, EdgeRecord, GraphDef, NodeRecord};
use huntdraw_store::{
  EntityStore, Error, InstanceStatus, JobLog, SqliteStore, WorkflowInstance, WorkflowJob,
};
use serde_json::json;

async fn store() -> SqliteStore {
  SqliteStore::connect("sqlite::memory:")
    .await
    .expect("failed to open in-memory database")
}

#[tokio::test]
async fn test_instance_upsert() {
  let store = store().await;
  let mut instance = WorkflowInstance::new("org-1", "wf-1");
  store.save_instance(&instance).await.unwrap();

  instance.status = InstanceStatus::BuildStarted;
  instance.definition_ref = Some("defs/wf-1.json".to_string());
  store.save_instance(&instance).await.unwrap();

  let loaded = store.get_instance(&instance.id).await.unwrap();
  assert_eq!(loaded.status, InstanceStatus::BuildStarted);
  assert_eq!(loaded.definition_ref.as_deref(), Some("defs/wf-1.json"));
  assert!(loaded.execution_handle_ref.is_none());
}

#[tokio::test]
async fn test_missing_rows_map_to_not_found() {
  let store = store().await;
  assert!(matches!(
    store.get_instance("missing").await,
    Err(Error::NotFound(_))
  ));
  assert!(matches!(store.get_job("missing").await, Err(Error::NotFound(_))));
  assert!(matches!(
    store.get_document("missing").await,
    Err(Error::NotFound(_))
  ));
}

#[tokio::test]
async fn test_job_and_logs() {
  let store = store().await;
  let instance = WorkflowInstance::new("org-1", "wf-1");
  store.save_instance(&instance).await.unwrap();

  let mut job = WorkflowJob::new(&instance.id);
  store.save_job(&job).await.unwrap();
  job.pre_execution_failure = Some(true);
  store.save_job(&job).await.unwrap();

  let loaded = store.get_job(&job.id).await.unwrap();
  assert_eq!(loaded.pre_execution_failure, Some(true));

  store
    .append_job_log(&JobLog::new(&job.id, "CycleDetected", json!({ "nodeId": "B" })))
    .await
    .unwrap();
  store
    .append_job_log(&JobLog::new(&job.id, "Timeout", json!({})))
    .await
    .unwrap();

  let logs = store.list_job_logs(&job.id).await.unwrap();
  let keys: Vec<&str> = logs.iter().map(|l| l.message_key.as_str()).collect();
  assert_eq!(keys, vec!["CycleDetected", "Timeout"]);
  assert_eq!(logs[0].params.0, json!({ "nodeId": "B" }));
}

#[tokio::test]
async fn test_graph_replaced_and_ordered() {
  let store = store().await;
  let graph = GraphDef {
    nodes: vec![
      NodeRecord::new("b", "draw"),
      NodeRecord::new("a", "hunt_code_import"),
      NodeRecord::new("f", "hunt_code_file").with_document("doc"),
    ],
    edges: vec![
      EdgeRecord::new("e1", "a", "b"),
      EdgeRecord::new("e2", "f", "a"),
    ],
    documents: vec![DocumentRecord {
      id: "doc".to_string(),
      key: "uploads/doc.csv".to_string(),
      content_type: "text/csv".to_string(),
    }],
  };
  store.save_graph("inst", &graph).await.unwrap();
  store.save_graph("inst", &graph).await.unwrap();

  let nodes = store.list_nodes("inst").await.unwrap();
  let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
  assert_eq!(ids, vec!["b", "a", "f"]);
  assert_eq!(nodes[2].document_id.as_deref(), Some("doc"));

  let edges = store.list_edges("inst").await.unwrap();
  assert_eq!(edges, graph.edges);

  let doc = store.get_document("doc").await.unwrap();
  assert_eq!(doc.content_type, "text/csv");
}
