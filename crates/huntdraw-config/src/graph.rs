use serde::{Deserialize, Serialize};

use crate::document::DocumentRecord;
use crate::edge::EdgeRecord;
use crate::node::NodeRecord;

/// The full stored record set of one workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDef {
  pub nodes: Vec<NodeRecord>,
  pub edges: Vec<EdgeRecord>,
  #[serde(default)]
  pub documents: Vec<DocumentRecord>,
}
