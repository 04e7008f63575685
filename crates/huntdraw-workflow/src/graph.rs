use std::collections::HashMap;

use huntdraw_config::{EdgeRecord, NodeKind, NodeRecord};

use crate::error::GraphError;

/// A node with its resolved connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
  pub id: String,
  pub kind: NodeKind,
  /// Upstream functional nodes.
  pub sources: Vec<String>,
  /// Downstream functional nodes.
  pub targets: Vec<String>,
  /// Data-source nodes feeding this node.
  pub overrides: Vec<String>,
  pub attached_document_id: Option<String>,
}

impl GraphNode {
  pub fn is_functional(&self) -> bool {
    self.kind.is_functional()
  }
}

/// Graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  nodes: HashMap<String, GraphNode>,
  /// Node ids in record order, so iteration is stable across runs.
  order: Vec<String>,
}

impl Graph {
  /// Build a graph from stored node and edge records.
  pub fn build(records: &[NodeRecord], edges: &[EdgeRecord]) -> Result<Self, GraphError> {
    let mut nodes: HashMap<String, GraphNode> = HashMap::with_capacity(records.len());
    let mut order = Vec::with_capacity(records.len());

    for record in records {
      let kind: NodeKind = record
        .node_type
        .parse()
        .map_err(|_| GraphError::InvalidNodeType {
          node_id: record.id.clone(),
          node_type: record.node_type.clone(),
        })?;

      if nodes.contains_key(&record.id) {
        return Err(GraphError::DuplicateNodeId {
          node_id: record.id.clone(),
        });
      }

      order.push(record.id.clone());
      nodes.insert(
        record.id.clone(),
        GraphNode {
          id: record.id.clone(),
          kind,
          sources: Vec::new(),
          targets: Vec::new(),
          overrides: Vec::new(),
          attached_document_id: record.document_id.clone(),
        },
      );
    }

    for edge in edges {
      let source_functional = match nodes.get(&edge.source) {
        Some(node) => node.is_functional(),
        None => {
          return Err(GraphError::EdgeHasInvalidSource {
            edge_id: edge.id.clone(),
            node_id: edge.source.clone(),
          });
        }
      };
      let target_functional = match nodes.get(&edge.target) {
        Some(node) => node.is_functional(),
        None => {
          return Err(GraphError::EdgeHasInvalidTarget {
            edge_id: edge.id.clone(),
            node_id: edge.target.clone(),
          });
        }
      };

      match (source_functional, target_functional) {
        (true, true) => {
          if let Some(source) = nodes.get_mut(&edge.source) {
            source.targets.push(edge.target.clone());
          }
          if let Some(target) = nodes.get_mut(&edge.target) {
            target.sources.push(edge.source.clone());
          }
        }
        (false, _) => {
          if let Some(target) = nodes.get_mut(&edge.target) {
            target.overrides.push(edge.source.clone());
          }
        }
        // A task pointing at a data source carries no meaning for the chain.
        (true, false) => {}
      }
    }

    Ok(Self { nodes, order })
  }

  /// Get a node by ID.
  pub fn get(&self, node_id: &str) -> Option<&GraphNode> {
    self.nodes.get(node_id)
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Iterate all nodes in record order.
  pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
    self.order.iter().filter_map(|id| self.nodes.get(id))
  }

  /// Iterate functional nodes in record order.
  pub fn functional_nodes(&self) -> impl Iterator<Item = &GraphNode> {
    self.nodes().filter(|node| node.is_functional())
  }

  /// Functional nodes with no functional predecessor.
  pub fn entry_points(&self) -> Vec<&GraphNode> {
    self
      .functional_nodes()
      .filter(|node| node.sources.is_empty())
      .collect()
  }

  /// Functional nodes with no functional successor.
  pub fn exit_points(&self) -> Vec<&GraphNode> {
    self
      .functional_nodes()
      .filter(|node| node.targets.is_empty())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn nodes() -> Vec<NodeRecord> {
    vec![
      NodeRecord::new("import", "hunt_code_import"),
      NodeRecord::new("draw", "draw"),
      NodeRecord::new("config", "draw_config_file").with_document("doc-1"),
    ]
  }

  #[test]
  fn test_build_classifies_edges() {
    let edges = vec![
      EdgeRecord::new("e1", "import", "draw"),
      EdgeRecord::new("e2", "config", "draw"),
    ];
    let graph = Graph::build(&nodes(), &edges).unwrap();

    let draw = graph.get("draw").unwrap();
    assert_eq!(draw.sources, vec!["import".to_string()]);
    assert_eq!(draw.overrides, vec!["config".to_string()]);
    assert!(draw.targets.is_empty());

    let import = graph.get("import").unwrap();
    assert_eq!(import.targets, vec!["draw".to_string()]);

    let config = graph.get("config").unwrap();
    assert!(config.sources.is_empty() && config.targets.is_empty());
    assert_eq!(config.attached_document_id.as_deref(), Some("doc-1"));
  }

  #[test]
  fn test_entry_and_exit_points_ignore_data_sources() {
    let edges = vec![
      EdgeRecord::new("e1", "import", "draw"),
      EdgeRecord::new("e2", "config", "draw"),
    ];
    let graph = Graph::build(&nodes(), &edges).unwrap();

    let entries: Vec<&str> = graph.entry_points().iter().map(|n| n.id.as_str()).collect();
    let exits: Vec<&str> = graph.exit_points().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(entries, vec!["import"]);
    assert_eq!(exits, vec!["draw"]);
  }

  #[test]
  fn test_build_rejects_invalid_edge_source() {
    let edges = vec![EdgeRecord::new("e1", "ghost", "draw")];
    let err = Graph::build(&nodes(), &edges).unwrap_err();
    assert_eq!(
      err,
      GraphError::EdgeHasInvalidSource {
        edge_id: "e1".to_string(),
        node_id: "ghost".to_string(),
      }
    );
  }

  #[test]
  fn test_build_rejects_invalid_edge_target() {
    let edges = vec![EdgeRecord::new("e1", "draw", "ghost")];
    let err = Graph::build(&nodes(), &edges).unwrap_err();
    assert!(matches!(err, GraphError::EdgeHasInvalidTarget { .. }));
  }

  #[test]
  fn test_build_rejects_unknown_type() {
    let records = vec![NodeRecord::new("x", "teleport")];
    let err = Graph::build(&records, &[]).unwrap_err();
    assert!(matches!(err, GraphError::InvalidNodeType { .. }));
  }

  #[test]
  fn test_build_rejects_duplicate_id() {
    let records = vec![NodeRecord::new("x", "draw"), NodeRecord::new("x", "draw")];
    let err = Graph::build(&records, &[]).unwrap_err();
    assert_eq!(
      err,
      GraphError::DuplicateNodeId {
        node_id: "x".to_string()
      }
    );
  }
}
