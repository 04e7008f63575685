//! Huntdraw Compiler
//!
//! Turns the node/edge graph of one workflow instance into a
//! [`TaskChainDefinition`]: a linear chain of tasks, one per functional
//! node, each pointing at the next or marked terminal.
//!
//! Compilation:
//! 1. Builds the graph (rejects unknown types and dangling edges)
//! 2. Validates the shape (no branching, one start, at most one end)
//! 3. Walks the chain from the start node, detecting cycles as it goes
//! 4. Resolves every task type to a resource reference and wires
//!    parameters, including documents attached through data-source nodes

mod compiler;
mod definition;
mod error;
mod registry;

pub use compiler::TaskChainCompiler;
pub use definition::{
  Chain, OverrideParameter, Task, TaskChainDefinition, TaskParameters, ORGANIZATION_ID_PATH,
  WORKFLOW_JOB_ID_PATH,
};
pub use error::{CompileError, ErrorClass};
pub use registry::ResourceRegistry;
