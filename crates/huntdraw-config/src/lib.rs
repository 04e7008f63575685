//! Huntdraw Config
//!
//! This crate contains the serializable records a workflow graph is stored as:
//! nodes, edges and the documents attached to data-source nodes. These are the
//! rows the entity store hands back before anything has been validated.
//!
//! Records can be loaded from:
//! - JSON files (via CLI with `huntdraw compile graph.json`)
//! - The entity store (one node/edge set per workflow instance)
//!
//! The compiler takes these records, builds a graph from them and turns the
//! graph into a task-chain definition.

mod document;
mod edge;
mod graph;
mod node;

pub use document::{DocumentRecord, DocumentType};
pub use edge::EdgeRecord;
pub use graph::GraphDef;
pub use node::{DataSourceKind, NodeKind, NodeRecord, TaskKind, UnknownNodeKind};
