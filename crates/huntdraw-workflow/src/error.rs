use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("duplicate node id: {node_id}")]
  DuplicateNodeId { node_id: String },

  #[error("node '{node_id}' has invalid type '{node_type}'")]
  InvalidNodeType { node_id: String, node_type: String },

  #[error("edge '{edge_id}' has invalid source '{node_id}'")]
  EdgeHasInvalidSource { edge_id: String, node_id: String },

  #[error("edge '{edge_id}' has invalid target '{node_id}'")]
  EdgeHasInvalidTarget { edge_id: String, node_id: String },
}
