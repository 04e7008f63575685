use std::collections::HashMap;

use huntdraw_config::TaskKind;

/// Maps task kinds to the execution-engine resource that runs them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRegistry {
  resources: HashMap<TaskKind, String>,
}

impl ResourceRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry routing every task kind to `local:<kind>`.
  pub fn local() -> Self {
    TaskKind::ALL
      .into_iter()
      .map(|kind| (kind, format!("local:{}", kind)))
      .collect()
  }

  pub fn with(mut self, kind: TaskKind, resource_ref: impl Into<String>) -> Self {
    self.insert(kind, resource_ref);
    self
  }

  pub fn insert(&mut self, kind: TaskKind, resource_ref: impl Into<String>) {
    self.resources.insert(kind, resource_ref.into());
  }

  pub fn resolve(&self, kind: TaskKind) -> Option<&str> {
    self.resources.get(&kind).map(String::as_str)
  }
}

impl FromIterator<(TaskKind, String)> for ResourceRegistry {
  fn from_iter<I: IntoIterator<Item = (TaskKind, String)>>(iter: I) -> Self {
    Self {
      resources: iter.into_iter().collect(),
    }
  }
}
