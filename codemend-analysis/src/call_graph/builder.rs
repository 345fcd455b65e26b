//! Call graph construction — three phases: nodes, call edges, import edges.

use codemend_core::FxHashMap;

use crate::parser::{FunctionDef, ImportKind, ModuleAst};
use crate::rules::tables;

use super::types::{CallEdge, CallGraph, CallNode, EdgeKind};

/// Build a call graph from parsed modules, in input order.
///
/// Name-index candidate lists are kept lexicographically sorted by module
/// path so that cross-module fallback resolution is deterministic.
pub fn build_call_graph(modules: &[(String, ModuleAst)]) -> CallGraph {
    let mut graph = CallGraph::new();

    // Phase 1: nodes, plus a bare-name index for resolution.
    let mut name_index: FxHashMap<String, Vec<String>> = FxHashMap::default();

    let mut ordered: Vec<&(String, ModuleAst)> = modules.iter().collect();
    ordered.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    for (path, ast) in &ordered {
        for func in &ast.functions {
            let id = CallGraph::node_id(path, &func.name);
            graph.add_node(make_node(path, &func.name, func, id.clone()));
            name_index.entry(func.name.clone()).or_default().push(id);
        }
        for class in &ast.classes {
            for method in &class.methods {
                let qualified = format!("{}.{}", class.name, method.name);
                let id = CallGraph::node_id(path, &qualified);
                graph.add_node(make_node(path, &qualified, method, id.clone()));
                name_index
                    .entry(qualified.clone())
                    .or_default()
                    .push(id.clone());
                name_index
                    .entry(method.name.clone())
                    .or_default()
                    .push(id);
            }
        }
    }

    // Phase 2: intra- and inter-module call edges.
    for (path, ast) in modules {
        let import_map = build_import_map(ast);

        for func in ast.all_functions() {
            let caller_id = CallGraph::node_id(path, func.display_name());
            let Some(caller_idx) = graph.get_index(&caller_id) else {
                continue;
            };
            let caller_async = graph.graph[caller_idx].is_async;

            for call_name in &func.calls {
                if call_name.is_empty() {
                    continue;
                }
                for callee_id in
                    resolve_callee(call_name, path, &name_index, &import_map, modules)
                {
                    let Some(callee_idx) = graph.get_index(&callee_id) else {
                        continue;
                    };
                    let callee_async = graph.graph[callee_idx].is_async;
                    graph.add_edge(
                        caller_idx,
                        callee_idx,
                        CallEdge {
                            kind: EdgeKind::Direct,
                            async_boundary_crossing: caller_async != callee_async,
                            line: 0,
                        },
                    );
                }
            }
        }
    }

    // Phase 3: import edges for dependency visibility.
    for (path, ast) in modules {
        for imp in &ast.imports {
            if imp.kind != ImportKind::From {
                continue;
            }
            for (target_path, _) in modules {
                if target_path == path || !module_matches(&imp.module, target_path) {
                    continue;
                }
                for name in &imp.imported_names {
                    let target_id = CallGraph::node_id(target_path, name);
                    let Some(target_idx) = graph.get_index(&target_id) else {
                        continue;
                    };
                    let source_idx = importer_node(&mut graph, path, name, imp.line);
                    graph.add_edge(
                        source_idx,
                        target_idx,
                        CallEdge {
                            kind: EdgeKind::Import,
                            async_boundary_crossing: false,
                            line: imp.line,
                        },
                    );
                }
            }
        }
    }

    graph
}

fn make_node(path: &str, function: &str, func: &FunctionDef, id: String) -> CallNode {
    CallNode {
        id,
        module: path.to_string(),
        function: function.to_string(),
        is_async: func.is_async,
        is_entry_point: is_entry_point(&func.name, &func.decorators),
        reads_shared_state: func.reads_globals.clone(),
        writes_shared_state: func.writes_globals.clone(),
        line: func.line,
    }
}

/// Import-edge source: the importer's own function of that name when it
/// exists, otherwise the module pseudo-node.
fn importer_node(
    graph: &mut CallGraph,
    path: &str,
    name: &str,
    line: u32,
) -> petgraph::stable_graph::NodeIndex {
    let own_id = CallGraph::node_id(path, name);
    if let Some(idx) = graph.get_index(&own_id) {
        return idx;
    }
    let pseudo_id = CallGraph::node_id(path, "__module__");
    if let Some(idx) = graph.get_index(&pseudo_id) {
        return idx;
    }
    graph.add_node(CallNode {
        id: pseudo_id,
        module: path.to_string(),
        function: "__module__".to_string(),
        is_async: false,
        is_entry_point: false,
        reads_shared_state: Vec::new(),
        writes_shared_state: Vec::new(),
        line,
    })
}

/// Entry points: `main`/`__main__` by name, or any decorator whose
/// case-insensitive spelling contains a request-handler pattern.
pub fn is_entry_point(func_name: &str, decorators: &[String]) -> bool {
    if matches!(func_name, "main" | "__main__") {
        return true;
    }
    decorators.iter().any(|d| {
        let dl = d.to_lowercase();
        tables::ENTRY_POINT_DECORATOR_PATTERNS
            .iter()
            .any(|pat| dl.contains(pat))
    })
}

/// Alias map for one module: imported/aliased name → module string.
fn build_import_map(ast: &ModuleAst) -> FxHashMap<String, String> {
    let mut map = FxHashMap::default();
    for imp in &ast.imports {
        match imp.kind {
            ImportKind::From => {
                for name in &imp.imported_names {
                    map.insert(name.clone(), imp.module.clone());
                }
            }
            ImportKind::Plain => match &imp.alias {
                Some(alias) => {
                    map.insert(alias.clone(), imp.module.clone());
                }
                None => {
                    map.insert(imp.module.clone(), imp.module.clone());
                }
            },
        }
    }
    map
}

/// Resolve a call target to candidate node ids.
///
/// Order: same-module function of that name; dotted prefix through the
/// import map; first global match (candidate lists are pre-sorted by module
/// path, so "first" is lexicographic).
fn resolve_callee(
    call_name: &str,
    current_module: &str,
    name_index: &FxHashMap<String, Vec<String>>,
    import_map: &FxHashMap<String, String>,
    modules: &[(String, ModuleAst)],
) -> Vec<String> {
    if let Some(candidates) = name_index.get(call_name) {
        let prefix = format!("{current_module}::");
        let same_module: Vec<String> = candidates
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .cloned()
            .collect();
        if !same_module.is_empty() {
            return same_module;
        }
        return candidates.iter().take(1).cloned().collect();
    }

    if let Some((head, _)) = call_name.split_once('.') {
        if let Some(imported_module) = import_map.get(head) {
            let tail = call_name.rsplit('.').next().unwrap_or(call_name);
            let mut paths: Vec<&str> = modules
                .iter()
                .map(|(p, _)| p.as_str())
                .filter(|p| module_matches(imported_module, p))
                .collect();
            paths.sort_unstable();
            if let Some(path) = paths.first() {
                return vec![CallGraph::node_id(path, tail)];
            }
        }
    }

    Vec::new()
}

/// Whether a dotted module name plausibly refers to a file path.
fn module_matches(module_name: &str, file_path: &str) -> bool {
    if module_name.is_empty() {
        return false;
    }
    let normalized = file_path
        .replace(['/', '\\'], ".")
        .trim_end_matches(".py")
        .to_string();
    normalized.contains(module_name) || normalized.ends_with(module_name)
}
