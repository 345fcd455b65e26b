//! BFS traversal: blast radius, max depth, affected subgraph.
//!
//! Graphs are cyclic in general; every walk carries a visited set and
//! nothing here recurses.

use std::collections::VecDeque;

use codemend_core::FxHashSet;
use petgraph::Direction;

use super::types::{CallGraph, EdgeSnapshot};

/// BFS depth from a node through outgoing edges, counting levels.
pub fn blast_radius(graph: &CallGraph, node_id: &str) -> u32 {
    let Some(start) = graph.get_index(node_id) else {
        return 0;
    };

    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();
    let mut depth = 0u32;

    visited.insert(start);
    queue.push_back((start, 0u32));

    while let Some((node, level)) = queue.pop_front() {
        depth = depth.max(level);
        for neighbor in graph.graph.neighbors_directed(node, Direction::Outgoing) {
            if visited.insert(neighbor) {
                queue.push_back((neighbor, level + 1));
            }
        }
    }

    depth
}

/// Maximum blast radius across all nodes; 0 for an empty graph.
pub fn max_depth(graph: &CallGraph) -> u32 {
    graph
        .node_ids()
        .iter()
        .map(|id| blast_radius(graph, id))
        .max()
        .unwrap_or(0)
}

/// The induced subgraph around `seed_ids`, expanded by `hops` rounds of
/// both callers and callees.
pub fn affected_subgraph(graph: &CallGraph, seed_ids: &[&str], hops: u32) -> CallGraph {
    let mut expanded: FxHashSet<String> = seed_ids
        .iter()
        .filter(|id| graph.contains(id))
        .map(|id| id.to_string())
        .collect();
    let mut frontier: Vec<String> = expanded.iter().cloned().collect();
    frontier.sort_unstable();

    for _ in 0..hops {
        let mut next_frontier: Vec<String> = Vec::new();
        for id in &frontier {
            for neighbor in graph.neighbors(id).into_iter().chain(graph.callers(id)) {
                if expanded.insert(neighbor.clone()) {
                    next_frontier.push(neighbor);
                }
            }
        }
        next_frontier.sort_unstable();
        next_frontier.dedup();
        frontier = next_frontier;
        if frontier.is_empty() {
            break;
        }
    }

    induced_subgraph(graph, &expanded)
}

fn induced_subgraph(graph: &CallGraph, node_ids: &FxHashSet<String>) -> CallGraph {
    let mut sub = CallGraph::new();
    for id in graph.node_ids() {
        if node_ids.contains(id) {
            if let Some(node) = graph.get_node(id) {
                sub.add_node(node.clone());
            }
        }
    }

    let snapshot = graph.snapshot();
    for EdgeSnapshot {
        source_id,
        target_id,
        kind,
        async_boundary_crossing,
        line,
    } in snapshot.edges
    {
        if node_ids.contains(&source_id) && node_ids.contains(&target_id) {
            if let (Some(s), Some(t)) = (sub.get_index(&source_id), sub.get_index(&target_id)) {
                sub.add_edge(
                    s,
                    t,
                    super::types::CallEdge {
                        kind,
                        async_boundary_crossing,
                        line,
                    },
                );
            }
        }
    }
    sub
}
