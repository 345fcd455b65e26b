//! Module AST model — the immutable structured extract of one source file.
//!
//! Produced once by the parser and handed to the call graph builder, the
//! rule catalog, and the data-flow analyzer by shared reference. Nothing
//! mutates a `ModuleAst` after construction.

use serde::{Deserialize, Serialize};

/// Import statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// `import x` / `import x as y`
    Plain,
    /// `from x import y`
    From,
}

/// A single import statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub module: String,
    pub imported_names: Vec<String>,
    pub alias: Option<String>,
    pub line: u32,
    pub kind: ImportKind,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<String>,
}

/// A function or method definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FunctionDef {
    pub name: String,
    /// `name` for module-level functions, `ClassName.methodName` for methods.
    pub qualified_name: String,
    pub line: u32,
    pub end_line: u32,
    pub is_async: bool,
    pub decorators: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub return_annotation: Option<String>,
    /// Every invocation target, dotted names preserved (`"a.b.c"`).
    pub calls: Vec<String>,
    /// Awaited call targets; a subset of `calls`.
    pub awaits: Vec<String>,
    pub exceptions_raised: Vec<String>,
    pub exceptions_caught: Vec<String>,
    pub has_bare_except: bool,
    pub has_try_except: bool,
    /// Module-level names read (Load context) inside the body.
    pub reads_globals: Vec<String>,
    /// Module-level names written (Store/Del context) inside the body.
    /// A `global` declaration forces the name in regardless of context.
    pub writes_globals: Vec<String>,
    /// Exact source substring spanning `line..end_line` inclusive.
    pub body_source: String,
}

impl FunctionDef {
    /// The qualified name when present, otherwise the bare name.
    pub fn display_name(&self) -> &str {
        if self.qualified_name.is_empty() {
            &self.name
        } else {
            &self.qualified_name
        }
    }
}

/// A class definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub line: u32,
    pub end_line: u32,
    pub bases: Vec<String>,
    pub methods: Vec<FunctionDef>,
    pub class_variables: Vec<String>,
    pub decorators: Vec<String>,
}

/// Assignment scope for a variable mutation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationScope {
    Module,
    Local,
    Class,
}

/// Syntactically inferred target type of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    List,
    Dict,
    Set,
    Other,
}

impl TargetType {
    /// True for the container types the concurrency rules care about.
    pub fn is_mutable_container(self) -> bool {
        matches!(self, Self::List | Self::Dict | Self::Set)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Dict => "dict",
            Self::Set => "set",
            Self::Other => "other",
        }
    }
}

/// A module-level assignment or an augmented assignment anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableMutation {
    pub name: String,
    pub line: u32,
    pub scope: MutationScope,
    pub is_augmented: bool,
    pub target_type: Option<TargetType>,
}

/// Kind of async boundary occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncBoundaryKind {
    AsyncDef,
    Await,
    AsyncFor,
    AsyncWith,
}

/// An async construct occurrence, tagged with its enclosing function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncBoundary {
    pub kind: AsyncBoundaryKind,
    /// Awaited call target or defined function name; empty when unnamed.
    pub name: String,
    pub line: u32,
    pub enclosing_function: String,
}

/// A call made in module-level statements, outside any function or class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleCall {
    pub name: String,
    pub line: u32,
    pub positional_args: usize,
    pub all_positional_string_literals: bool,
}

/// One record per except-handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionFlow {
    pub line: u32,
    pub end_line: u32,
    pub exception_types: Vec<String>,
    pub is_bare: bool,
    pub has_reraise: bool,
}

/// Complete structured representation of a parsed module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleAst {
    pub file_path: String,
    pub language: String,
    pub total_lines: u32,
    pub imports: Vec<ImportRecord>,
    pub functions: Vec<FunctionDef>,
    pub classes: Vec<ClassDef>,
    pub variable_mutations: Vec<VariableMutation>,
    /// Calls made at module scope, outside any function or class body.
    pub module_calls: Vec<ModuleCall>,
    pub async_boundaries: Vec<AsyncBoundary>,
    pub exception_flows: Vec<ExceptionFlow>,
    /// Every name bound at module scope, first-binding order, deduplicated.
    pub module_level_names: Vec<String>,
    pub parse_errors: Vec<String>,
}

impl ModuleAst {
    /// An empty module AST carrying only identity and error notes.
    pub fn empty(file_path: &str, language: &str, total_lines: u32, parse_errors: Vec<String>) -> Self {
        Self {
            file_path: file_path.to_string(),
            language: language.to_string(),
            total_lines,
            imports: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            variable_mutations: Vec::new(),
            module_calls: Vec::new(),
            async_boundaries: Vec::new(),
            exception_flows: Vec::new(),
            module_level_names: Vec::new(),
            parse_errors,
        }
    }

    /// All functions in the module: top-level then methods, definition order.
    pub fn all_functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.methods.iter()))
    }

    /// Module-level mutable containers as `(name, type, line)` rows.
    pub fn module_level_mutables(&self) -> Vec<(&str, TargetType, u32)> {
        self.variable_mutations
            .iter()
            .filter(|vm| vm.scope == MutationScope::Module)
            .filter_map(|vm| {
                vm.target_type
                    .filter(|t| t.is_mutable_container())
                    .map(|t| (vm.name.as_str(), t, vm.line))
            })
            .collect()
    }
}
