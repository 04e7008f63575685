use huntdraw_workflow::GraphError;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Broad class of a compile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// The graph shape cannot be turned into a chain.
  Structural,
  /// A node references something that cannot be resolved.
  DataResolution,
}

/// Errors that can occur while compiling a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("no start node found")]
  NoStartNodeFound,

  #[error("multiple start nodes found: {}", node_ids.join(", "))]
  MultipleStartNodesFound { node_ids: Vec<String> },

  #[error("multiple end nodes found: {}", node_ids.join(", "))]
  MultipleEndNodesFound { node_ids: Vec<String> },

  #[error("node '{node_id}' has {} outgoing edges, parallel nodes are not supported", targets.len())]
  ParallelNodesNotSupported {
    node_id: String,
    targets: Vec<String>,
  },

  #[error("cycle detected at node '{node_id}'")]
  CycleDetected { node_id: String },

  #[error("nodes not reachable from the start node: {}", node_ids.join(", "))]
  UnreachableNodes { node_ids: Vec<String> },

  #[error("no resource registered for node '{node_id}' of type '{node_type}'")]
  NoResourceFound { node_id: String, node_type: String },

  #[error("data node '{node_id}' has no document")]
  DataNodeHasNoDocument { node_id: String },

  #[error("data node '{node_id}' has unsupported content type '{content_type}'")]
  InvalidMimeType {
    node_id: String,
    content_type: String,
  },
}

impl CompileError {
  pub fn class(&self) -> ErrorClass {
    match self {
      CompileError::NoResourceFound { .. }
      | CompileError::DataNodeHasNoDocument { .. }
      | CompileError::InvalidMimeType { .. } => ErrorClass::DataResolution,
      _ => ErrorClass::Structural,
    }
  }

  /// Stable key identifying the failure in persisted job logs.
  pub fn message_key(&self) -> &'static str {
    match self {
      CompileError::Graph(GraphError::DuplicateNodeId { .. }) => "DuplicateNodeId",
      CompileError::Graph(GraphError::InvalidNodeType { .. }) => "InvalidNodeType",
      CompileError::Graph(GraphError::EdgeHasInvalidSource { .. }) => "EdgeHasInvalidSource",
      CompileError::Graph(GraphError::EdgeHasInvalidTarget { .. }) => "EdgeHasInvalidTarget",
      CompileError::NoStartNodeFound => "NoStartNodeFound",
      CompileError::MultipleStartNodesFound { .. } => "MultipleStartNodesFound",
      CompileError::MultipleEndNodesFound { .. } => "MultipleEndNodesFound",
      CompileError::ParallelNodesNotSupported { .. } => "ParallelNodesNotSupported",
      CompileError::CycleDetected { .. } => "CycleDetected",
      CompileError::UnreachableNodes { .. } => "UnreachableNodes",
      CompileError::NoResourceFound { .. } => "NoResourceFound",
      CompileError::DataNodeHasNoDocument { .. } => "DataNodeHasNoDocument",
      CompileError::InvalidMimeType { .. } => "InvalidMimeType",
    }
  }

  /// Structured parameters accompanying [`message_key`](Self::message_key).
  pub fn params(&self) -> Map<String, Value> {
    let value = match self {
      CompileError::Graph(GraphError::DuplicateNodeId { node_id }) => json!({ "nodeId": node_id }),
      CompileError::Graph(GraphError::InvalidNodeType { node_id, node_type }) => {
        json!({ "nodeId": node_id, "nodeType": node_type })
      }
      CompileError::Graph(GraphError::EdgeHasInvalidSource { edge_id, node_id })
      | CompileError::Graph(GraphError::EdgeHasInvalidTarget { edge_id, node_id }) => {
        json!({ "edgeId": edge_id, "nodeId": node_id })
      }
      CompileError::NoStartNodeFound => json!({}),
      CompileError::MultipleStartNodesFound { node_ids }
      | CompileError::MultipleEndNodesFound { node_ids }
      | CompileError::UnreachableNodes { node_ids } => json!({ "nodeIds": node_ids }),
      CompileError::ParallelNodesNotSupported { node_id, targets } => {
        json!({ "nodeId": node_id, "targets": targets })
      }
      CompileError::CycleDetected { node_id } | CompileError::DataNodeHasNoDocument { node_id } => {
        json!({ "nodeId": node_id })
      }
      CompileError::NoResourceFound { node_id, node_type } => {
        json!({ "nodeId": node_id, "nodeType": node_type })
      }
      CompileError::InvalidMimeType {
        node_id,
        content_type,
      } => json!({ "nodeId": node_id, "contentType": content_type }),
    };

    match value {
      Value::Object(map) => map,
      _ => Map::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_class() {
    assert_eq!(CompileError::NoStartNodeFound.class(), ErrorClass::Structural);
    assert_eq!(
      CompileError::DataNodeHasNoDocument {
        node_id: "n".to_string()
      }
      .class(),
      ErrorClass::DataResolution
    );
  }

  #[test]
  fn test_params_for_cycle() {
    let err = CompileError::CycleDetected {
      node_id: "B".to_string(),
    };
    assert_eq!(err.message_key(), "CycleDetected");
    assert_eq!(err.params().get("nodeId"), Some(&json!("B")));
  }

  #[test]
  fn test_graph_error_keeps_its_key() {
    let err = CompileError::from(GraphError::EdgeHasInvalidTarget {
      edge_id: "e".to_string(),
      node_id: "x".to_string(),
    });
    assert_eq!(err.message_key(), "EdgeHasInvalidTarget");
    assert_eq!(err.params().get("edgeId"), Some(&json!("e")));
  }
}
