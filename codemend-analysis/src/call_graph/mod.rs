//! Cross-module call graph: construction and traversal.

pub mod builder;
pub mod traversal;
pub mod types;

pub use builder::{build_call_graph, is_entry_point};
pub use traversal::{affected_subgraph, blast_radius, max_depth};
pub use types::{CallEdge, CallGraph, CallNode, EdgeKind, EdgeSnapshot, GraphSnapshot};
