use std::collections::{BTreeMap, HashMap};

use huntdraw_config::{DocumentRecord, DocumentType, EdgeRecord, NodeKind, NodeRecord};
use huntdraw_workflow::{Graph, GraphNode};
use tracing::debug;

use crate::definition::{
  ORGANIZATION_ID_PATH, OverrideParameter, Task, TaskChainDefinition, TaskParameters,
  WORKFLOW_JOB_ID_PATH,
};
use crate::error::CompileError;
use crate::registry::ResourceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
  Unvisited,
  OnPath,
  Done,
}

/// Compiles workflow graphs into task chains.
#[derive(Debug, Clone)]
pub struct TaskChainCompiler {
  registry: ResourceRegistry,
}

impl TaskChainCompiler {
  /// Create a compiler resolving task kinds through `registry`.
  pub fn new(registry: ResourceRegistry) -> Self {
    Self { registry }
  }

  /// Build, validate and compile a stored record set.
  pub fn compile(
    &self,
    nodes: &[NodeRecord],
    edges: &[EdgeRecord],
    documents: &[DocumentRecord],
  ) -> Result<TaskChainDefinition, CompileError> {
    let graph = Graph::build(nodes, edges)?;
    let documents: HashMap<&str, &DocumentRecord> =
      documents.iter().map(|doc| (doc.id.as_str(), doc)).collect();
    self.compile_graph(&graph, &documents)
  }

  /// Validate and compile an already built graph.
  pub fn compile_graph(
    &self,
    graph: &Graph,
    documents: &HashMap<&str, &DocumentRecord>,
  ) -> Result<TaskChainDefinition, CompileError> {
    let start = validate_shape(graph)?;

    let mut color: HashMap<&str, Color> = graph
      .functional_nodes()
      .map(|node| (node.id.as_str(), Color::Unvisited))
      .collect();
    let mut tasks = BTreeMap::new();

    // Explicit stack of (node, index of next target to explore).
    let mut stack: Vec<(&GraphNode, usize)> = Vec::new();
    color.insert(start.id.as_str(), Color::OnPath);
    tasks.insert(start.id.clone(), self.compile_node(graph, start, None, documents)?);
    stack.push((start, 0));

    while let Some(&(node, index)) = stack.last() {
      let Some(next_id) = node.targets.get(index) else {
        color.insert(node.id.as_str(), Color::Done);
        stack.pop();
        continue;
      };
      if let Some(top) = stack.last_mut() {
        top.1 += 1;
      }

      match color.get(next_id.as_str()) {
        Some(Color::OnPath) => {
          return Err(CompileError::CycleDetected {
            node_id: next_id.clone(),
          });
        }
        Some(Color::Done) => continue,
        _ => {}
      }

      let Some(next) = graph.get(next_id) else {
        continue;
      };
      color.insert(next.id.as_str(), Color::OnPath);
      tasks.insert(
        next.id.clone(),
        self.compile_node(graph, next, Some(node.id.as_str()), documents)?,
      );
      stack.push((next, 0));
    }

    let unreachable: Vec<String> = graph
      .functional_nodes()
      .filter(|node| color.get(node.id.as_str()) == Some(&Color::Unvisited))
      .map(|node| node.id.clone())
      .collect();
    if !unreachable.is_empty() {
      return Err(CompileError::UnreachableNodes {
        node_ids: unreachable,
      });
    }

    debug!(start = %start.id, tasks = tasks.len(), "compiled task chain");

    Ok(TaskChainDefinition {
      start_node_id: start.id.clone(),
      tasks,
    })
  }

  /// Compile a single functional node into a task.
  fn compile_node(
    &self,
    graph: &Graph,
    node: &GraphNode,
    previous: Option<&str>,
    documents: &HashMap<&str, &DocumentRecord>,
  ) -> Result<Task, CompileError> {
    let resource_ref = match node.kind {
      NodeKind::Task(kind) => self.registry.resolve(kind),
      NodeKind::DataSource(_) => None,
    }
    .ok_or_else(|| CompileError::NoResourceFound {
      node_id: node.id.clone(),
      node_type: node.kind.to_string(),
    })?;

    let overrides = node
      .overrides
      .iter()
      .filter_map(|id| graph.get(id))
      .map(|source| resolve_override(source, documents))
      .collect::<Result<Vec<_>, _>>()?;

    let (previous_node_id, previous_result, seed) = match previous {
      Some(prev) => (
        Some(prev.to_string()),
        Some(TaskChainDefinition::result_path(prev)),
        None,
      ),
      None => (None, None, Some(serde_json::json!({}))),
    };

    let next = node.targets.first().cloned();
    let terminal = next.is_none();

    Ok(Task {
      resource_ref: resource_ref.to_string(),
      parameters: TaskParameters {
        organization_id: ORGANIZATION_ID_PATH.to_string(),
        workflow_job_id: WORKFLOW_JOB_ID_PATH.to_string(),
        previous_node_id,
        previous_result,
        seed,
        overrides,
      },
      next,
      terminal,
    })
  }
}

/// Check the graph is a single linear chain and return its start node.
fn validate_shape(graph: &Graph) -> Result<&GraphNode, CompileError> {
  if let Some(node) = graph.functional_nodes().find(|n| n.targets.len() > 1) {
    return Err(CompileError::ParallelNodesNotSupported {
      node_id: node.id.clone(),
      targets: node.targets.clone(),
    });
  }

  // Ends are checked before starts: with no branching, two ends can only
  // come from two disjoint chains, which also have two starts.
  let exits = graph.exit_points();
  if exits.len() > 1 {
    return Err(CompileError::MultipleEndNodesFound {
      node_ids: exits.iter().map(|n| n.id.clone()).collect(),
    });
  }

  let entries = graph.entry_points();
  let start = match entries.as_slice() {
    [] => return Err(CompileError::NoStartNodeFound),
    [start] => *start,
    many => {
      return Err(CompileError::MultipleStartNodesFound {
        node_ids: many.iter().map(|n| n.id.clone()).collect(),
      });
    }
  };

  Ok(start)
}

fn resolve_override(
  source: &GraphNode,
  documents: &HashMap<&str, &DocumentRecord>,
) -> Result<OverrideParameter, CompileError> {
  let NodeKind::DataSource(kind) = source.kind else {
    return Err(CompileError::DataNodeHasNoDocument {
      node_id: source.id.clone(),
    });
  };

  let document = source
    .attached_document_id
    .as_deref()
    .and_then(|id| documents.get(id))
    .ok_or_else(|| CompileError::DataNodeHasNoDocument {
      node_id: source.id.clone(),
    })?;

  let document_type = DocumentType::from_mime(&document.content_type).ok_or_else(|| {
    CompileError::InvalidMimeType {
      node_id: source.id.clone(),
      content_type: document.content_type.clone(),
    }
  })?;

  Ok(OverrideParameter {
    node_id: source.id.clone(),
    source: kind,
    document_id: document.id.clone(),
    key: document.key.clone(),
    document_type,
  })
}
