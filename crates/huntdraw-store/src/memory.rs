use std::collections::HashMap;

use async_trait::async_trait;
use huntdraw_config::{DocumentRecord, EdgeRecord, GraphDef, NodeRecord};
use tokio::sync::Mutex;

use crate::{EntityStore, Error, JobLog, WorkflowInstance, WorkflowJob};

#[derive(Default)]
struct State {
  instances: HashMap<String, WorkflowInstance>,
  jobs: HashMap<String, WorkflowJob>,
  logs: Vec<JobLog>,
  graphs: HashMap<String, GraphDef>,
  documents: HashMap<String, DocumentRecord>,
}

/// In-memory entity store.
///
/// Holds everything behind a single async mutex. Suitable for tests and
/// one-shot CLI runs.
#[derive(Default)]
pub struct MemoryStore {
  state: Mutex<State>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl EntityStore for MemoryStore {
  async fn get_instance(&self, instance_id: &str) -> Result<WorkflowInstance, Error> {
    let state = self.state.lock().await;
    state
      .instances
      .get(instance_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("workflow instance {}", instance_id)))
  }

  async fn save_instance(&self, instance: &WorkflowInstance) -> Result<(), Error> {
    let mut state = self.state.lock().await;
    state
      .instances
      .insert(instance.id.clone(), instance.clone());
    Ok(())
  }

  async fn get_job(&self, job_id: &str) -> Result<WorkflowJob, Error> {
    let state = self.state.lock().await;
    state
      .jobs
      .get(job_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("workflow job {}", job_id)))
  }

  async fn save_job(&self, job: &WorkflowJob) -> Result<(), Error> {
    let mut state = self.state.lock().await;
    state.jobs.insert(job.id.clone(), job.clone());
    Ok(())
  }

  async fn append_job_log(&self, log: &JobLog) -> Result<(), Error> {
    let mut state = self.state.lock().await;
    state.logs.push(log.clone());
    Ok(())
  }

  async fn list_job_logs(&self, job_id: &str) -> Result<Vec<JobLog>, Error> {
    let state = self.state.lock().await;
    Ok(
      state
        .logs
        .iter()
        .filter(|log| log.workflow_job_id == job_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_nodes(&self, instance_id: &str) -> Result<Vec<NodeRecord>, Error> {
    let state = self.state.lock().await;
    Ok(
      state
        .graphs
        .get(instance_id)
        .map(|graph| graph.nodes.clone())
        .unwrap_or_default(),
    )
  }

  async fn list_edges(&self, instance_id: &str) -> Result<Vec<EdgeRecord>, Error> {
    let state = self.state.lock().await;
    Ok(
      state
        .graphs
        .get(instance_id)
        .map(|graph| graph.edges.clone())
        .unwrap_or_default(),
    )
  }

  async fn save_graph(&self, instance_id: &str, graph: &GraphDef) -> Result<(), Error> {
    let mut state = self.state.lock().await;
    for document in &graph.documents {
      state
        .documents
        .insert(document.id.clone(), document.clone());
    }
    state.graphs.insert(
      instance_id.to_string(),
      GraphDef {
        nodes: graph.nodes.clone(),
        edges: graph.edges.clone(),
        documents: Vec::new(),
      },
    );
    Ok(())
  }

  async fn get_document(&self, document_id: &str) -> Result<DocumentRecord, Error> {
    let state = self.state.lock().await;
    state
      .documents
      .get(document_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("document {}", document_id)))
  }

  async fn save_document(&self, document: &DocumentRecord) -> Result<(), Error> {
    let mut state = self.state.lock().await;
    state
      .documents
      .insert(document.id.clone(), document.clone());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use crate::InstanceStatus;

  #[tokio::test]
  async fn test_instance_round_trip() {
    let store = MemoryStore::new();
    let mut instance = WorkflowInstance::new("org-1", "wf-1");
    store.save_instance(&instance).await.unwrap();

    instance.status = InstanceStatus::Ready;
    store.save_instance(&instance).await.unwrap();

    let loaded = store.get_instance(&instance.id).await.unwrap();
    assert_eq!(loaded.status, InstanceStatus::Ready);
  }

  #[tokio::test]
  async fn test_missing_instance_is_not_found() {
    let store = MemoryStore::new();
    let err = store.get_instance("nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }

  #[tokio::test]
  async fn test_save_graph_registers_documents() {
    let store = MemoryStore::new();
    let graph = GraphDef {
      nodes: vec![NodeRecord::new("a", "draw")],
      edges: vec![],
      documents: vec![DocumentRecord {
        id: "d".to_string(),
        key: "k".to_string(),
        content_type: "text/csv".to_string(),
      }],
    };
    store.save_graph("i", &graph).await.unwrap();

    assert_eq!(store.list_nodes("i").await.unwrap().len(), 1);
    assert!(store.list_edges("i").await.unwrap().is_empty());
    assert_eq!(store.get_document("d").await.unwrap().key, "k");
  }

  #[tokio::test]
  async fn test_logs_are_filtered_by_job() {
    let store = MemoryStore::new();
    store
      .append_job_log(&JobLog::new("j1", "CycleDetected", serde_json::json!({})))
      .await
      .unwrap();
    store
      .append_job_log(&JobLog::new("j2", "NoStartNodeFound", serde_json::json!({})))
      .await
      .unwrap();

    let logs = store.list_job_logs("j1").await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message_key, "CycleDetected");
  }
}
