//! Call graph tests — node ids, resolution, import edges, async boundary
//! crossings, BFS traversal on cyclic graphs, and entry points.

use codemend_analysis::call_graph::{
    affected_subgraph, blast_radius, build_call_graph, max_depth, CallGraph, EdgeKind,
};
use codemend_analysis::parser::{parse_file, ModuleAst};

fn modules(sources: &[(&str, &str)]) -> Vec<(String, ModuleAst)> {
    sources
        .iter()
        .map(|(path, source)| (path.to_string(), parse_file(source, path)))
        .collect()
}

#[test]
fn nodes_for_functions_and_methods() {
    let mods = modules(&[(
        "svc.py",
        r#"def helper():
    return 1

class Api:
    def handle(self):
        return helper()
"#,
    )]);
    let graph = build_call_graph(&mods);

    assert!(graph.contains("svc.py::helper"));
    assert!(graph.contains("svc.py::Api.handle"));
    assert_eq!(graph.node_count(), 2);
}

#[test]
fn same_module_calls_resolve_first() {
    let mods = modules(&[(
        "a.py",
        r#"def helper():
    return 1

def main():
    helper()
"#,
    )]);
    let graph = build_call_graph(&mods);

    let callees = graph.neighbors("a.py::main");
    assert_eq!(callees, vec!["a.py::helper"]);
    assert!(graph.get_node("a.py::main").unwrap().is_entry_point);
}

#[test]
fn cross_module_resolution_and_import_edges() {
    let mods = modules(&[
        (
            "a.py",
            r#"def helper():
    return 1
"#,
        ),
        (
            "b.py",
            r#"from a import helper

def entry():
    helper()
"#,
        ),
    ]);
    let graph = build_call_graph(&mods);

    // Call edge from the caller in b.py to the definition in a.py.
    assert_eq!(graph.neighbors("b.py::entry"), vec!["a.py::helper"]);

    // Import edge for dependency visibility, from the module pseudo-node.
    let snapshot = graph.snapshot();
    let import_edge = snapshot
        .edges
        .iter()
        .find(|e| e.kind == EdgeKind::Import)
        .expect("import edge present");
    assert_eq!(import_edge.target_id, "a.py::helper");
    // Every edge endpoint is a real node.
    for edge in &snapshot.edges {
        assert!(graph.contains(&edge.source_id));
        assert!(graph.contains(&edge.target_id));
    }
}

#[test]
fn async_boundary_crossing_marked() {
    let mods = modules(&[(
        "m.py",
        r#"def work():
    return 2

async def runner():
    work()
"#,
    )]);
    let graph = build_call_graph(&mods);

    let snapshot = graph.snapshot();
    let edge = snapshot
        .edges
        .iter()
        .find(|e| e.source_id == "m.py::runner")
        .expect("call edge present");
    assert!(edge.async_boundary_crossing);
}

#[test]
fn blast_radius_counts_levels() {
    let mods = modules(&[(
        "chain.py",
        r#"def a():
    b()

def b():
    c()

def c():
    d()

def d():
    return 1
"#,
    )]);
    let graph = build_call_graph(&mods);

    assert_eq!(blast_radius(&graph, "chain.py::a"), 3);
    assert_eq!(blast_radius(&graph, "chain.py::c"), 1);
    assert_eq!(blast_radius(&graph, "chain.py::d"), 0);
    assert_eq!(max_depth(&graph), 3);
}

#[test]
fn blast_radius_terminates_on_cycles() {
    let mods = modules(&[(
        "cycle.py",
        r#"def ping():
    pong()

def pong():
    ping()
"#,
    )]);
    let graph = build_call_graph(&mods);

    assert_eq!(blast_radius(&graph, "cycle.py::ping"), 1);
    assert_eq!(max_depth(&graph), 1);
}

#[test]
fn affected_subgraph_expands_both_directions() {
    let mods = modules(&[(
        "chain.py",
        r#"def a():
    b()

def b():
    c()

def c():
    d()

def d():
    return 1
"#,
    )]);
    let graph = build_call_graph(&mods);

    let sub = affected_subgraph(&graph, &["chain.py::b"], 1);
    assert!(sub.contains("chain.py::a"));
    assert!(sub.contains("chain.py::b"));
    assert!(sub.contains("chain.py::c"));
    assert!(!sub.contains("chain.py::d"));
}

#[test]
fn decorated_handlers_are_entry_points() {
    let mods = modules(&[(
        "routes.py",
        r#"@app.get("/items")
def list_items():
    return []

def internal():
    return 1
"#,
    )]);
    let graph = build_call_graph(&mods);

    assert!(graph.get_node("routes.py::list_items").unwrap().is_entry_point);
    assert!(!graph.get_node("routes.py::internal").unwrap().is_entry_point);
}

#[test]
fn empty_graph_has_zero_depth() {
    let graph = CallGraph::new();
    assert_eq!(max_depth(&graph), 0);
    assert_eq!(blast_radius(&graph, "missing::node"), 0);
}

#[test]
fn shared_state_propagates_to_nodes() {
    let mods = modules(&[(
        "state.py",
        r#"registry = {}

def put(k, v):
    global registry
    registry[k] = v
"#,
    )]);
    let graph = build_call_graph(&mods);

    let node = graph.get_node("state.py::put").unwrap();
    assert!(node.writes_shared_state.iter().any(|n| n == "registry"));
}
