//! Call graph model — petgraph-backed with a stable string-id index.

use codemend_core::FxHashMap;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// Kind of call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Direct,
    Import,
    Method,
    Callback,
}

/// A node in the call graph: one function in one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallNode {
    /// `module_path::qualified_function_name`
    pub id: String,
    pub module: String,
    pub function: String,
    pub is_async: bool,
    pub is_entry_point: bool,
    pub reads_shared_state: Vec<String>,
    pub writes_shared_state: Vec<String>,
    pub line: u32,
}

/// A caller → callee edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEdge {
    pub kind: EdgeKind,
    pub async_boundary_crossing: bool,
    pub line: u32,
}

/// Complete call graph for a set of modules. Cyclic in general.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    pub graph: StableDiGraph<CallNode, CallEdge>,
    index: FxHashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the canonical node id.
    pub fn node_id(module: &str, function: &str) -> String {
        format!("{module}::{function}")
    }

    /// Insert a node, replacing any node already registered under its id.
    pub fn add_node(&mut self, node: CallNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            self.graph[idx] = node;
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, edge: CallEdge) {
        self.graph.add_edge(source, target, edge);
    }

    pub fn get_index(&self, node_id: &str) -> Option<NodeIndex> {
        self.index.get(node_id).copied()
    }

    pub fn get_node(&self, node_id: &str) -> Option<&CallNode> {
        self.get_index(node_id).map(|idx| &self.graph[idx])
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.index.contains_key(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node ids, sorted for deterministic iteration.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.index.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Direct callees of a node.
    pub fn neighbors(&self, node_id: &str) -> Vec<String> {
        self.adjacent(node_id, Direction::Outgoing)
    }

    /// Direct callers of a node.
    pub fn callers(&self, node_id: &str) -> Vec<String> {
        self.adjacent(node_id, Direction::Incoming)
    }

    fn adjacent(&self, node_id: &str, direction: Direction) -> Vec<String> {
        let Some(idx) = self.get_index(node_id) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Serializable snapshot: sorted node list plus resolved edge list.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<&CallNode> = self.graph.node_weights().collect();
        nodes.sort_unstable_by(|a, b| a.id.cmp(&b.id));

        let mut edges: Vec<EdgeSnapshot> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (s, t) = self.graph.edge_endpoints(e)?;
                let edge = &self.graph[e];
                Some(EdgeSnapshot {
                    source_id: self.graph[s].id.clone(),
                    target_id: self.graph[t].id.clone(),
                    kind: edge.kind,
                    async_boundary_crossing: edge.async_boundary_crossing,
                    line: edge.line,
                })
            })
            .collect();
        edges.sort_unstable_by(|a, b| {
            (a.source_id.as_str(), a.target_id.as_str(), a.line)
                .cmp(&(b.source_id.as_str(), b.target_id.as_str(), b.line))
        });

        GraphSnapshot {
            nodes: nodes.into_iter().cloned().collect(),
            edges,
        }
    }
}

/// Serializable edge with resolved endpoint ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
    pub async_boundary_crossing: bool,
    pub line: u32,
}

/// Deterministic serializable view of a call graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<CallNode>,
    pub edges: Vec<EdgeSnapshot>,
}
