use serde::{Deserialize, Serialize};

/// A directed edge between two stored nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
  pub id: String,
  pub source: String,
  pub target: String,
}

impl EdgeRecord {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
    }
  }
}
