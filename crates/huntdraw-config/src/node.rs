use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A node as stored by the workflow editor.
///
/// `node_type` is kept as the raw stored string; it is parsed into a
/// [`NodeKind`] when the graph is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
  pub id: String,
  pub node_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub document_id: Option<String>,
}

impl NodeRecord {
  pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      node_type: node_type.into(),
      document_id: None,
    }
  }

  pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
    self.document_id = Some(document_id.into());
    self
  }
}

/// Task types that become a step in the compiled chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
  HuntCodeImport,
  ApplicantImport,
  Draw,
  ResultPublish,
}

/// Node types that only feed documents into a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
  HuntCodeFile,
  ApplicantFile,
  DrawSortFile,
  DrawConfigFile,
}

/// Closed set of node types a graph may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
  Task(TaskKind),
  DataSource(DataSourceKind),
}

impl NodeKind {
  pub fn is_functional(&self) -> bool {
    matches!(self, NodeKind::Task(_))
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKind::Task(kind) => kind.as_str(),
      NodeKind::DataSource(kind) => kind.as_str(),
    }
  }
}

impl TaskKind {
  pub const ALL: [TaskKind; 4] = [
    TaskKind::HuntCodeImport,
    TaskKind::ApplicantImport,
    TaskKind::Draw,
    TaskKind::ResultPublish,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      TaskKind::HuntCodeImport => "hunt_code_import",
      TaskKind::ApplicantImport => "applicant_import",
      TaskKind::Draw => "draw",
      TaskKind::ResultPublish => "result_publish",
    }
  }
}

impl DataSourceKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      DataSourceKind::HuntCodeFile => "hunt_code_file",
      DataSourceKind::ApplicantFile => "applicant_file",
      DataSourceKind::DrawSortFile => "draw_sort_file",
      DataSourceKind::DrawConfigFile => "draw_config_file",
    }
  }
}

/// A stored node type string that names no known node kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node type: {0}")]
pub struct UnknownNodeKind(pub String);

impl FromStr for NodeKind {
  type Err = UnknownNodeKind;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let kind = match s {
      "hunt_code_import" => NodeKind::Task(TaskKind::HuntCodeImport),
      "applicant_import" => NodeKind::Task(TaskKind::ApplicantImport),
      "draw" => NodeKind::Task(TaskKind::Draw),
      "result_publish" => NodeKind::Task(TaskKind::ResultPublish),
      "hunt_code_file" => NodeKind::DataSource(DataSourceKind::HuntCodeFile),
      "applicant_file" => NodeKind::DataSource(DataSourceKind::ApplicantFile),
      "draw_sort_file" => NodeKind::DataSource(DataSourceKind::DrawSortFile),
      "draw_config_file" => NodeKind::DataSource(DataSourceKind::DrawConfigFile),
      other => return Err(UnknownNodeKind(other.to_string())),
    };
    Ok(kind)
  }
}

impl FromStr for TaskKind {
  type Err = UnknownNodeKind;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.parse::<NodeKind>()? {
      NodeKind::Task(kind) => Ok(kind),
      NodeKind::DataSource(_) => Err(UnknownNodeKind(s.to_string())),
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Display for TaskKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
