//! Python source extraction — tree-sitter driven, deterministic.
//!
//! One pass over the top-level statements binds module names, a second pass
//! extracts functions, classes, imports, mutations, async boundaries, and
//! exception flows. Identical input yields byte-identical output.

use std::collections::BTreeSet;

use codemend_core::FxHashSet;
use tree_sitter::Node;

use super::ast_util::{
    dotted_name, end_line_of, has_child_kind, line_of, node_text, parse_python_fragment, visit,
};
use super::types::{
    AsyncBoundary, AsyncBoundaryKind, ClassDef, ExceptionFlow, FunctionDef, ImportKind,
    ImportRecord, ModuleAst, ModuleCall, MutationScope, Parameter, TargetType, VariableMutation,
};

/// Parse Python source into a `ModuleAst`.
///
/// A source whose parse tree contains error or missing nodes yields an AST
/// with one parse-error note and every collection empty. This is not an
/// error condition for the caller.
pub fn parse_python(source: &str, file_path: &str) -> ModuleAst {
    let total_lines = source.lines().count() as u32;

    let Some(tree) = parse_python_fragment(source) else {
        return ModuleAst::empty(
            file_path,
            "python",
            total_lines,
            vec!["parser produced no tree".to_string()],
        );
    };

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return ModuleAst::empty(
            file_path,
            "python",
            total_lines,
            vec![format!("syntax error near line {line}")],
        );
    }

    let extractor = Extractor {
        source,
        lines: source.lines().collect(),
    };
    extractor.extract(root, file_path, total_lines)
}

struct Extractor<'s> {
    source: &'s str,
    lines: Vec<&'s str>,
}

impl<'s> Extractor<'s> {
    fn extract(&self, root: Node<'_>, file_path: &str, total_lines: u32) -> ModuleAst {
        // First pass: every name bound at module scope, so function bodies
        // can resolve global reads/writes regardless of definition order.
        let module_names = self.collect_module_names(root);

        let mut imports = Vec::new();
        let mut functions = Vec::new();
        let mut classes = Vec::new();
        let mut variable_mutations = Vec::new();
        let mut module_calls = Vec::new();
        let mut async_boundaries = Vec::new();
        let mut module_level_names = Vec::new();
        let mut seen_names: FxHashSet<String> = FxHashSet::default();
        let mut bind = |name: &str, out: &mut Vec<String>| {
            if seen_names.insert(name.to_string()) {
                out.push(name.to_string());
            }
        };

        let mut cursor = root.walk();
        for stmt in root.named_children(&mut cursor) {
            match stmt.kind() {
                "import_statement" => self.extract_plain_import(stmt, &mut imports),
                "import_from_statement" | "future_import_statement" => {
                    self.extract_from_import(stmt, &mut imports);
                }
                "function_definition" => {
                    let func = self.extract_function(stmt, Vec::new(), None, None, &module_names);
                    bind(&func.name, &mut module_level_names);
                    self.record_async_boundaries(stmt, &func, &mut async_boundaries);
                    functions.push(func);
                }
                "class_definition" => {
                    let class = self.extract_class(stmt, Vec::new(), &module_names);
                    bind(&class.name, &mut module_level_names);
                    classes.push(class);
                }
                "decorated_definition" => {
                    let decorators = self.extract_decorators(stmt);
                    if let Some(def) = stmt.child_by_field_name("definition") {
                        match def.kind() {
                            "function_definition" => {
                                let func = self.extract_function(
                                    def,
                                    decorators,
                                    None,
                                    Some(stmt),
                                    &module_names,
                                );
                                bind(&func.name, &mut module_level_names);
                                self.record_async_boundaries(def, &func, &mut async_boundaries);
                                functions.push(func);
                            }
                            "class_definition" => {
                                let class = self.extract_class(def, decorators, &module_names);
                                bind(&class.name, &mut module_level_names);
                                classes.push(class);
                            }
                            _ => {}
                        }
                    }
                }
                "expression_statement" => {
                    let mut inner = stmt.walk();
                    for expr in stmt.named_children(&mut inner) {
                        if expr.kind() == "assignment" {
                            self.extract_module_assignment(
                                expr,
                                &mut variable_mutations,
                                |name| bind(name, &mut module_level_names),
                            );
                        }
                    }
                    self.extract_module_calls(stmt, &mut module_calls);
                }
                "if_statement" | "for_statement" | "while_statement" | "try_statement"
                | "with_statement" => {
                    self.extract_module_calls(stmt, &mut module_calls);
                }
                _ => {}
            }
        }

        // Augmented assignments anywhere, scope-tagged by ancestry.
        let mut exception_flows = Vec::new();
        visit(root, &mut |node| match node.kind() {
            "augmented_assignment" => {
                if let Some(target) = node.child_by_field_name("left") {
                    if let Some(name) = self.expr_name(target) {
                        variable_mutations.push(VariableMutation {
                            name,
                            line: line_of(node),
                            scope: enclosing_scope(node),
                            is_augmented: true,
                            target_type: None,
                        });
                    }
                }
            }
            "except_clause" | "except_group_clause" => {
                exception_flows.push(self.extract_exception_flow(node));
            }
            _ => {}
        });

        ModuleAst {
            file_path: file_path.to_string(),
            language: "python".to_string(),
            total_lines,
            imports,
            functions,
            classes,
            variable_mutations,
            module_calls,
            async_boundaries,
            exception_flows,
            module_level_names,
            parse_errors: Vec::new(),
        }
    }

    /// Calls inside a module-level statement, not descending into nested
    /// function or class definitions.
    fn extract_module_calls(&self, stmt: Node<'_>, out: &mut Vec<ModuleCall>) {
        if matches!(
            stmt.kind(),
            "function_definition" | "class_definition" | "decorated_definition"
        ) {
            return;
        }

        if stmt.kind() == "call" {
            if let Some(name) = self.expr_name_of_call(stmt) {
                let (positional_args, all_positional_string_literals) = self.call_arg_shape(stmt);
                out.push(ModuleCall {
                    name,
                    line: line_of(stmt),
                    positional_args,
                    all_positional_string_literals,
                });
            }
        }

        let mut cursor = stmt.walk();
        for child in stmt.named_children(&mut cursor) {
            self.extract_module_calls(child, out);
        }
    }

    fn expr_name_of_call(&self, call: Node<'_>) -> Option<String> {
        let func = call.child_by_field_name("function")?;
        self.expr_name(func)
    }

    fn call_arg_shape(&self, call: Node<'_>) -> (usize, bool) {
        let mut positional = 0usize;
        let mut all_strings = true;
        if let Some(arguments) = call.child_by_field_name("arguments") {
            let mut cursor = arguments.walk();
            for arg in arguments.named_children(&mut cursor) {
                match arg.kind() {
                    "keyword_argument" | "comment" => {}
                    "string" => positional += 1,
                    _ => {
                        positional += 1;
                        all_strings = false;
                    }
                }
            }
        }
        (positional, all_strings)
    }

    /// Names bound at module scope: top-level functions, classes, and
    /// assignment targets.
    fn collect_module_names(&self, root: Node<'_>) -> FxHashSet<String> {
        let mut names = FxHashSet::default();
        let mut cursor = root.walk();
        for stmt in root.named_children(&mut cursor) {
            match stmt.kind() {
                "function_definition" | "class_definition" => {
                    if let Some(name) = stmt.child_by_field_name("name") {
                        names.insert(self.text(name).to_string());
                    }
                }
                "decorated_definition" => {
                    if let Some(def) = stmt.child_by_field_name("definition") {
                        if let Some(name) = def.child_by_field_name("name") {
                            names.insert(self.text(name).to_string());
                        }
                    }
                }
                "expression_statement" => {
                    let mut inner = stmt.walk();
                    for expr in stmt.named_children(&mut inner) {
                        if expr.kind() == "assignment" && expr.child_by_field_name("right").is_some()
                        {
                            if let Some(left) = expr.child_by_field_name("left") {
                                for name in self.target_names(left) {
                                    names.insert(name);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        names
    }

    fn extract_plain_import(&self, stmt: Node<'_>, imports: &mut Vec<ImportRecord>) {
        let mut cursor = stmt.walk();
        for child in stmt.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let module = self.text(child).to_string();
                    imports.push(ImportRecord {
                        imported_names: vec![module.clone()],
                        module,
                        alias: None,
                        line: line_of(stmt),
                        kind: ImportKind::Plain,
                    });
                }
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| self.text(n).to_string());
                    imports.push(ImportRecord {
                        imported_names: vec![module.clone()],
                        module,
                        alias,
                        line: line_of(stmt),
                        kind: ImportKind::Plain,
                    });
                }
                _ => {}
            }
        }
    }

    fn extract_from_import(&self, stmt: Node<'_>, imports: &mut Vec<ImportRecord>) {
        let module = stmt
            .child_by_field_name("module_name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();

        let mut names = Vec::new();
        let module_node_id = stmt.child_by_field_name("module_name").map(|n| n.id());
        let mut cursor = stmt.walk();
        for child in stmt.named_children(&mut cursor) {
            if Some(child.id()) == module_node_id {
                continue;
            }
            match child.kind() {
                "dotted_name" | "identifier" => names.push(self.text(child).to_string()),
                "aliased_import" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        names.push(self.text(name).to_string());
                    }
                }
                "wildcard_import" => names.push("*".to_string()),
                _ => {}
            }
        }

        imports.push(ImportRecord {
            module,
            imported_names: names,
            alias: None,
            line: line_of(stmt),
            kind: ImportKind::From,
        });
    }

    fn extract_decorators(&self, decorated: Node<'_>) -> Vec<String> {
        let mut decorators = Vec::new();
        let mut cursor = decorated.walk();
        for child in decorated.named_children(&mut cursor) {
            if child.kind() == "decorator" {
                if let Some(expr) = child.named_child(0) {
                    if let Some(name) = self.decorator_name(expr) {
                        decorators.push(name);
                    }
                }
            }
        }
        decorators
    }

    /// Decorator spelling: call-form decorators record the callee's dotted
    /// name, so `@app.get("/x")` yields `"app.get"`.
    fn decorator_name(&self, expr: Node<'_>) -> Option<String> {
        if expr.kind() == "call" {
            let func = expr.child_by_field_name("function")?;
            return self.expr_name(func);
        }
        self.expr_name(expr)
    }

    fn extract_class(
        &self,
        node: Node<'_>,
        decorators: Vec<String>,
        module_names: &FxHashSet<String>,
    ) -> ClassDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();

        let mut bases = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for arg in superclasses.named_children(&mut cursor) {
                if arg.kind() == "keyword_argument" {
                    continue;
                }
                if let Some(base) = self.expr_name(arg) {
                    bases.push(base);
                }
            }
        }

        let mut methods = Vec::new();
        let mut class_variables = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for item in body.named_children(&mut cursor) {
                match item.kind() {
                    "function_definition" => {
                        methods.push(self.extract_function(
                            item,
                            Vec::new(),
                            Some(&name),
                            None,
                            module_names,
                        ));
                    }
                    "decorated_definition" => {
                        let decs = self.extract_decorators(item);
                        if let Some(def) = item.child_by_field_name("definition") {
                            if def.kind() == "function_definition" {
                                methods.push(self.extract_function(
                                    def,
                                    decs,
                                    Some(&name),
                                    Some(item),
                                    module_names,
                                ));
                            }
                        }
                    }
                    "expression_statement" => {
                        let mut inner = item.walk();
                        for expr in item.named_children(&mut inner) {
                            if expr.kind() == "assignment" {
                                if let Some(left) = expr.child_by_field_name("left") {
                                    class_variables.extend(self.target_names(left));
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        ClassDef {
            line: line_of(node),
            end_line: end_line_of(node),
            name,
            bases,
            methods,
            class_variables,
            decorators,
        }
    }

    /// Extract one function or method definition.
    ///
    /// `decorated` is the wrapping `decorated_definition` node when present;
    /// its decorator expressions contribute to the call list the same way the
    /// body does.
    fn extract_function(
        &self,
        node: Node<'_>,
        decorators: Vec<String>,
        class_name: Option<&str>,
        decorated: Option<Node<'_>>,
        module_names: &FxHashSet<String>,
    ) -> FunctionDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let qualified_name = match class_name {
            Some(class) => format!("{class}.{name}"),
            None => name.clone(),
        };
        let is_async = has_child_kind(node, "async");

        let mut parameters = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                match param.kind() {
                    "identifier" => parameters.push(Parameter {
                        name: self.text(param).to_string(),
                        annotation: None,
                    }),
                    "typed_parameter" => {
                        let pname = param
                            .named_child(0)
                            .filter(|n| n.kind() == "identifier")
                            .map(|n| self.text(n).to_string());
                        let annotation = param
                            .child_by_field_name("type")
                            .and_then(|t| self.annotation_name(t));
                        if let Some(pname) = pname {
                            parameters.push(Parameter {
                                name: pname,
                                annotation,
                            });
                        }
                    }
                    "default_parameter" => {
                        if let Some(pname) = param.child_by_field_name("name") {
                            parameters.push(Parameter {
                                name: self.text(pname).to_string(),
                                annotation: None,
                            });
                        }
                    }
                    "typed_default_parameter" => {
                        let pname = param
                            .child_by_field_name("name")
                            .map(|n| self.text(n).to_string());
                        let annotation = param
                            .child_by_field_name("type")
                            .and_then(|t| self.annotation_name(t));
                        if let Some(pname) = pname {
                            parameters.push(Parameter {
                                name: pname,
                                annotation,
                            });
                        }
                    }
                    "list_splat_pattern" | "dictionary_splat_pattern" => {
                        if let Some(inner) = param.named_child(0) {
                            if inner.kind() == "identifier" {
                                parameters.push(Parameter {
                                    name: self.text(inner).to_string(),
                                    annotation: None,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        let return_annotation = node
            .child_by_field_name("return_type")
            .and_then(|t| self.annotation_name(t));

        // Calls and awaited calls, decorator expressions included.
        let mut calls = Vec::new();
        let mut awaits = Vec::new();
        let call_root = decorated.unwrap_or(node);
        visit(call_root, &mut |child| match child.kind() {
            "call" => {
                if let Some(func) = child.child_by_field_name("function") {
                    if let Some(call_name) = self.expr_name(func) {
                        calls.push(call_name);
                    }
                }
            }
            "await" => {
                if let Some(inner) = child.named_child(0) {
                    if inner.kind() == "call" {
                        if let Some(func) = inner.child_by_field_name("function") {
                            if let Some(call_name) = self.expr_name(func) {
                                awaits.push(call_name);
                            }
                        }
                    }
                }
            }
            _ => {}
        });

        // Exception structure.
        let mut exceptions_raised = Vec::new();
        let mut exceptions_caught = Vec::new();
        let mut has_bare_except = false;
        let mut has_try_except = false;
        visit(node, &mut |child| match child.kind() {
            "raise_statement" => {
                if let Some(exc) = child.named_child(0) {
                    if let Some(raised) = self.raised_name(exc) {
                        exceptions_raised.push(raised);
                    }
                }
            }
            "except_clause" | "except_group_clause" => {
                has_try_except = true;
                let flow = self.extract_exception_flow(child);
                if flow.is_bare {
                    has_bare_except = true;
                } else {
                    exceptions_caught.extend(flow.exception_types);
                }
            }
            _ => {}
        });

        let (reads_globals, writes_globals) =
            self.global_access(node, &parameters, module_names);

        let line = line_of(node);
        let end_line = end_line_of(node);

        FunctionDef {
            name,
            qualified_name,
            line,
            end_line,
            is_async,
            decorators,
            parameters,
            return_annotation,
            calls,
            awaits,
            exceptions_raised,
            exceptions_caught,
            has_bare_except,
            has_try_except,
            reads_globals,
            writes_globals,
            body_source: self.line_span(line, end_line),
        }
    }

    fn extract_exception_flow(&self, clause: Node<'_>) -> ExceptionFlow {
        let mut exception_types = Vec::new();
        let mut is_bare = true;
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            if child.kind() == "block" {
                continue;
            }
            is_bare = false;
            let type_expr = if child.kind() == "as_pattern" {
                child.named_child(0)
            } else {
                Some(child)
            };
            if let Some(expr) = type_expr {
                if expr.kind() == "tuple" {
                    let mut inner = expr.walk();
                    for element in expr.named_children(&mut inner) {
                        if let Some(type_name) = self.expr_name(element) {
                            exception_types.push(type_name);
                        }
                    }
                } else if let Some(type_name) = self.expr_name(expr) {
                    exception_types.push(type_name);
                }
            }
        }

        let mut has_reraise = false;
        visit(clause, &mut |node| {
            if node.kind() == "raise_statement" && node.named_child(0).is_none() {
                has_reraise = true;
            }
        });

        ExceptionFlow {
            line: line_of(clause),
            end_line: end_line_of(clause),
            exception_types,
            is_bare,
            has_reraise,
        }
    }

    fn extract_module_assignment(
        &self,
        assignment: Node<'_>,
        mutations: &mut Vec<VariableMutation>,
        mut bind: impl FnMut(&str),
    ) {
        // Bare annotations (`x: int`) bind nothing.
        let Some(right) = assignment.child_by_field_name("right") else {
            return;
        };
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };

        let target_type = self.infer_target_type(right);
        for name in self.target_names(left) {
            bind(&name);
            mutations.push(VariableMutation {
                name,
                line: line_of(assignment),
                scope: MutationScope::Module,
                is_augmented: false,
                target_type,
            });
        }
    }

    /// Syntactic type inference: literal form, or the called constructor.
    fn infer_target_type(&self, value: Node<'_>) -> Option<TargetType> {
        match value.kind() {
            "list" | "list_comprehension" => Some(TargetType::List),
            "dictionary" | "dictionary_comprehension" => Some(TargetType::Dict),
            "set" | "set_comprehension" => Some(TargetType::Set),
            "call" => {
                let func = value.child_by_field_name("function")?;
                match self.expr_name(func)?.as_str() {
                    "list" => Some(TargetType::List),
                    "dict" => Some(TargetType::Dict),
                    "set" => Some(TargetType::Set),
                    _ => Some(TargetType::Other),
                }
            }
            _ => None,
        }
    }

    /// Assignment target names: plain identifiers, dotted attributes, the
    /// base of a subscript, and each element of a tuple/list target.
    fn target_names(&self, target: Node<'_>) -> Vec<String> {
        match target.kind() {
            "pattern_list" | "tuple_pattern" | "list_pattern" => {
                let mut names = Vec::new();
                let mut cursor = target.walk();
                for element in target.named_children(&mut cursor) {
                    if let Some(name) = self.expr_name(element) {
                        names.push(name);
                    }
                }
                names
            }
            _ => self.expr_name(target).into_iter().collect(),
        }
    }

    /// Reads and writes of module-level names within a function body.
    ///
    /// Bare identifier targets count as writes; the object of an attribute
    /// or subscript counts as a read, matching Python's Load/Store contexts.
    /// Parameters shadow module names. Names declared `global` are forced
    /// into the writes set.
    fn global_access(
        &self,
        func: Node<'_>,
        parameters: &[Parameter],
        module_names: &FxHashSet<String>,
    ) -> (Vec<String>, Vec<String>) {
        let param_names: FxHashSet<&str> =
            parameters.iter().map(|p| p.name.as_str()).collect();

        let mut declared_global: BTreeSet<String> = BTreeSet::new();
        visit(func, &mut |node| {
            if node.kind() == "global_statement" {
                let mut cursor = node.walk();
                for name in node.named_children(&mut cursor) {
                    if name.kind() == "identifier" {
                        declared_global.insert(self.text(name).to_string());
                    }
                }
            }
        });

        let mut reads: BTreeSet<String> = BTreeSet::new();
        let mut writes: BTreeSet<String> = BTreeSet::new();
        let body = func.child_by_field_name("body");
        if let Some(body) = body {
            self.collect_access(
                body,
                false,
                &param_names,
                &declared_global,
                module_names,
                &mut reads,
                &mut writes,
            );
        }

        // A `global` declaration forces the name into the writes set.
        for name in &declared_global {
            if !param_names.contains(name.as_str()) {
                writes.insert(name.clone());
            }
        }

        (reads.into_iter().collect(), writes.into_iter().collect())
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_access(
        &self,
        node: Node<'_>,
        store: bool,
        params: &FxHashSet<&str>,
        declared_global: &BTreeSet<String>,
        module_names: &FxHashSet<String>,
        reads: &mut BTreeSet<String>,
        writes: &mut BTreeSet<String>,
    ) {
        match node.kind() {
            "identifier" => {
                let name = self.text(node);
                if params.contains(name) {
                    return;
                }
                if declared_global.contains(name) || module_names.contains(name) {
                    if store {
                        writes.insert(name.to_string());
                    } else {
                        reads.insert(name.to_string());
                    }
                }
            }
            // Declarations and nested signatures never contribute accesses.
            "global_statement" | "nonlocal_statement" | "import_statement"
            | "import_from_statement" | "parameters" => {}
            "attribute" | "subscript" => {
                // `x.y = 1` and `x[0] = 1` load `x`; only bare names store.
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if node.kind() == "attribute"
                        && Some(child.id())
                            == node.child_by_field_name("attribute").map(|n| n.id())
                    {
                        continue;
                    }
                    self.collect_access(
                        child, false, params, declared_global, module_names, reads, writes,
                    );
                }
            }
            "assignment" | "augmented_assignment" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.collect_access(
                        left, true, params, declared_global, module_names, reads, writes,
                    );
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.collect_access(
                        right, false, params, declared_global, module_names, reads, writes,
                    );
                }
            }
            "for_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.collect_access(
                        left, true, params, declared_global, module_names, reads, writes,
                    );
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.collect_access(
                        right, false, params, declared_global, module_names, reads, writes,
                    );
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.collect_access(
                        body, false, params, declared_global, module_names, reads, writes,
                    );
                }
            }
            "as_pattern" => {
                if let Some(value) = node.named_child(0) {
                    self.collect_access(
                        value, false, params, declared_global, module_names, reads, writes,
                    );
                }
                if let Some(alias) = node.named_child(1) {
                    self.collect_access(
                        alias, true, params, declared_global, module_names, reads, writes,
                    );
                }
            }
            "delete_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect_access(
                        child, true, params, declared_global, module_names, reads, writes,
                    );
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.collect_access(
                        value, false, params, declared_global, module_names, reads, writes,
                    );
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect_access(
                        child, store, params, declared_global, module_names, reads, writes,
                    );
                }
            }
        }
    }

    /// Async boundary records for one module-level function.
    fn record_async_boundaries(
        &self,
        node: Node<'_>,
        func: &FunctionDef,
        boundaries: &mut Vec<AsyncBoundary>,
    ) {
        if !func.is_async {
            return;
        }
        boundaries.push(AsyncBoundary {
            kind: AsyncBoundaryKind::AsyncDef,
            name: func.name.clone(),
            line: func.line,
            enclosing_function: func.name.clone(),
        });

        visit(node, &mut |child| match child.kind() {
            "await" => {
                let awaited = child
                    .named_child(0)
                    .filter(|inner| inner.kind() == "call")
                    .and_then(|inner| inner.child_by_field_name("function"))
                    .and_then(|f| self.expr_name(f))
                    .unwrap_or_default();
                boundaries.push(AsyncBoundary {
                    kind: AsyncBoundaryKind::Await,
                    name: awaited,
                    line: line_of(child),
                    enclosing_function: func.name.clone(),
                });
            }
            "for_statement" if has_child_kind(child, "async") => {
                boundaries.push(AsyncBoundary {
                    kind: AsyncBoundaryKind::AsyncFor,
                    name: String::new(),
                    line: line_of(child),
                    enclosing_function: func.name.clone(),
                });
            }
            "with_statement" if has_child_kind(child, "async") => {
                boundaries.push(AsyncBoundary {
                    kind: AsyncBoundaryKind::AsyncWith,
                    name: String::new(),
                    line: line_of(child),
                    enclosing_function: func.name.clone(),
                });
            }
            _ => {}
        });
    }

    /// Dotted-name extraction: identifiers, attributes, the base of a
    /// subscript. Calls and other expressions yield nothing and are ignored
    /// downstream.
    fn expr_name(&self, node: Node<'_>) -> Option<String> {
        dotted_name(node, self.source)
    }

    /// Annotation spelling: `dict[str, int]` reports `dict`, `Optional[str]`
    /// reports `Optional`.
    fn annotation_name(&self, type_node: Node<'_>) -> Option<String> {
        let expr = type_node.named_child(0).unwrap_or(type_node);
        self.expr_name(expr)
    }

    /// Raised exception spelling: `raise ValueError("x")` reports
    /// `ValueError`.
    fn raised_name(&self, expr: Node<'_>) -> Option<String> {
        if expr.kind() == "call" {
            let func = expr.child_by_field_name("function")?;
            return self.expr_name(func);
        }
        self.expr_name(expr)
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node_text(node, self.source)
    }

    /// Exact source substring spanning `start..end` lines inclusive.
    fn line_span(&self, start: u32, end: u32) -> String {
        let start = (start.max(1) - 1) as usize;
        let end = (end as usize).min(self.lines.len());
        if start >= end {
            return String::new();
        }
        self.lines[start..end].join("\n")
    }
}

/// Scope of an augmented assignment, by nearest enclosing definition.
fn enclosing_scope(node: Node<'_>) -> MutationScope {
    let mut current = node.parent();
    while let Some(parent) = current {
        match parent.kind() {
            "function_definition" => return MutationScope::Local,
            "class_definition" => return MutationScope::Class,
            _ => {}
        }
        current = parent.parent();
    }
    MutationScope::Module
}

/// Line of the first error or missing node, for the parse-error note.
fn first_error_line(root: Node<'_>) -> Option<u32> {
    let mut found: Option<u32> = None;
    visit(root, &mut |node| {
        if found.is_none() && (node.is_error() || node.is_missing()) {
            found = Some(line_of(node));
        }
    });
    if root.is_error() {
        return Some(line_of(root));
    }
    found
}
