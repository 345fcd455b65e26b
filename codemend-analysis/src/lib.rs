//! # codemend-analysis
//!
//! Analysis side of the codemend engine: source parsing into module ASTs,
//! call graph construction, the deterministic rule catalog, risk scoring,
//! data-flow checks, and the per-file result cache.

pub mod cache;
pub mod call_graph;
pub mod data_flow;
pub mod engine;
pub mod parser;
pub mod rules;
pub mod scorer;
