//! Module descriptors and the dependency graph between them.
//!
//! - `descriptor`: named units with requirements and exports
//! - `graph`: lookup, visibility and validation over the edges
//! - `builtin`: the module set shipped with the runtime

mod builtin;
pub mod descriptor;
pub mod graph;

pub use descriptor::{ModuleDescriptor, ModuleKind, Requirement};
pub use graph::{ENTITY_MODULE, GraphViolation, ModuleGraph};
