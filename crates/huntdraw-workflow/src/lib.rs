//! Huntdraw Workflow
//!
//! This crate builds the in-memory graph for one workflow instance from its
//! stored node and edge records.
//!
//! Nodes are split into two classes:
//! - *functional* nodes, which become tasks in the compiled chain and are
//!   linked to each other through `sources`/`targets`
//! - *data-source* nodes, which only attach a document to the functional
//!   node they point at (recorded in that node's `overrides`)
//!
//! Building the graph rejects duplicate ids, unknown node types and edges
//! that reference nodes outside the record set. Shape rules (single start,
//! no branching, no cycles) are enforced later by the compiler.

mod error;
mod graph;

pub use error::GraphError;
pub use graph::{Graph, GraphNode};
