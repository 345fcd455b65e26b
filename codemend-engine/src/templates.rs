//! Deterministic fallback patches — concrete code templates keyed by rule
//! id. When the completion service fails or is unavailable, these generate
//! runnable replacement functions, not TODO comments.

use codemend_analysis::parser::ast_util::parse_python_fragment;
use codemend_core::textutil::leading_whitespace;
use codemend_core::FxHashMap;

/// A template generator: `(function_source, function_name) → patched code`.
pub type TemplateFn = fn(&str, &str) -> String;

/// Registry of template generators. Tests swap individual entries for
/// deliberately broken doubles.
pub struct TemplateLibrary {
    generators: FxHashMap<&'static str, TemplateFn>,
}

impl TemplateLibrary {
    /// Library with no templates registered.
    pub fn empty() -> Self {
        Self {
            generators: FxHashMap::default(),
        }
    }

    /// Install or replace the generator for one rule.
    pub fn register(&mut self, rule_id: &'static str, generator: TemplateFn) {
        self.generators.insert(rule_id, generator);
    }

    pub fn has_template(&self, rule_id: &str) -> bool {
        self.generators.contains_key(rule_id)
    }

    /// Generate a fallback patch for a rule. `None` when no template exists
    /// or the generated code does not parse.
    pub fn generate(
        &self,
        rule_id: &str,
        function_source: &str,
        function_name: &str,
    ) -> Option<String> {
        let Some(generator) = self.generators.get(rule_id) else {
            tracing::warn!(rule_id, "no fallback template for rule");
            return None;
        };

        let patched = generator(function_source, function_name);
        match parse_python_fragment(&patched) {
            Some(tree) if !tree.root_node().has_error() => Some(patched),
            _ => {
                tracing::error!(rule_id, "fallback patch produced syntax error");
                None
            }
        }
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        let mut library = Self::empty();
        library.register("db_conn_per_request", patch_db_conn_per_request);
        library.register("missing_http_timeout", patch_missing_http_timeout);
        library.register("blocking_io_in_async", patch_blocking_io_in_async);
        library.register("missing_idempotency", patch_missing_idempotency);
        library.register("partial_txn_no_rollback", patch_partial_txn_no_rollback);
        library.register(
            "missing_exception_boundary",
            patch_missing_exception_boundary,
        );
        library
    }
}

/// Replace raw DB connections with a pooled-connection pattern.
fn patch_db_conn_per_request(source: &str, _func_name: &str) -> String {
    let connect_markers = [
        "sqlite3.connect",
        "psycopg2.connect",
        "pymysql.connect",
        "mysql.connector.connect",
    ];

    let mut new_lines: Vec<String> = Vec::new();
    let mut pool_added = false;

    for line in source.lines() {
        if connect_markers.iter().any(|marker| line.contains(marker)) {
            if !pool_added {
                let indent = leading_whitespace(line);
                new_lines.push(format!(
                    "{indent}# Use connection pool instead of per-request connection"
                ));
                new_lines.push(format!(
                    "{indent}conn = get_db_connection()  # from connection pool"
                ));
                pool_added = true;
            }
            continue;
        }
        new_lines.push(line.to_string());
    }

    new_lines.join("\n")
}

/// Add `timeout=10` to HTTP client calls that lack one.
fn patch_missing_http_timeout(source: &str, _func_name: &str) -> String {
    let http_methods = [
        "requests.get",
        "requests.post",
        "requests.put",
        "requests.delete",
        "requests.patch",
        "requests.head",
        "httpx.get",
        "httpx.post",
        "httpx.put",
        "httpx.delete",
        "httpx.patch",
    ];

    source
        .lines()
        .map(|line| {
            let needs_timeout = http_methods.iter().any(|m| line.contains(m))
                && !line.contains("timeout");
            if !needs_timeout {
                return line.to_string();
            }
            if line.trim_end().ends_with(')') {
                let trimmed = line.trim_end();
                format!("{}, timeout=10)", &trimmed[..trimmed.len() - 1])
            } else if line.contains(')') {
                line.replacen(')', ", timeout=10)", 1)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace blocking calls with their async equivalents.
fn patch_blocking_io_in_async(source: &str, _func_name: &str) -> String {
    let replacements = [
        ("time.sleep(", "await asyncio.sleep("),
        ("requests.get(", "await httpx.AsyncClient().get("),
        ("requests.post(", "await httpx.AsyncClient().post("),
        ("requests.put(", "await httpx.AsyncClient().put("),
        ("requests.delete(", "await httpx.AsyncClient().delete("),
    ];

    let mut result = source.to_string();
    for (old, new) in replacements {
        result = result.replace(old, new);
    }
    result
}

/// Insert an idempotency-key check at the start of the function body.
fn patch_missing_idempotency(source: &str, _func_name: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return source.to_string();
    }

    let body_start = body_start_index(&lines);
    let indent = lines
        .get(body_start)
        .map(|line| leading_whitespace(line).to_string())
        .unwrap_or_else(|| "    ".to_string());

    let guard = [
        format!("{indent}# Idempotency guard — prevent duplicate processing"),
        format!("{indent}idempotency_key = request.headers.get('Idempotency-Key', '')"),
        format!("{indent}if idempotency_key:"),
        format!("{indent}    cached = await check_idempotency(idempotency_key)"),
        format!("{indent}    if cached is not None:"),
        format!("{indent}        return cached"),
    ];

    let mut out: Vec<String> = lines[..body_start].iter().map(|s| s.to_string()).collect();
    out.extend(guard);
    out.extend(lines[body_start..].iter().map(|s| s.to_string()));
    out.join("\n")
}

/// Wrap DB operations in try/except with rollback.
fn patch_partial_txn_no_rollback(source: &str, _func_name: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let mut new_lines: Vec<String> = Vec::new();
    let mut body_indent = "    ".to_string();
    let mut in_function_body = false;

    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim_start();
        if stripped.starts_with("def ") || stripped.starts_with("async def ") {
            new_lines.push(line.to_string());
            in_function_body = true;
            body_indent = format!("{}    ", leading_whitespace(line));
            continue;
        }

        if in_function_body && (line.contains("cursor.execute") || line.contains("session.add"))
        {
            // Wrap the remaining body in try/except with rollback.
            new_lines.push(format!("{body_indent}try:"));
            for rem_line in &lines[i..] {
                new_lines.push(format!("    {rem_line}"));
            }
            new_lines.push(format!("{body_indent}    conn.commit()"));
            new_lines.push(format!("{body_indent}except Exception:"));
            new_lines.push(format!("{body_indent}    conn.rollback()"));
            new_lines.push(format!("{body_indent}    raise"));
            return new_lines.join("\n");
        }

        new_lines.push(line.to_string());
    }

    new_lines.join("\n")
}

/// Wrap the function body in a try/except boundary.
fn patch_missing_exception_boundary(source: &str, func_name: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return source.to_string();
    }

    let mut func_indent = String::new();
    let mut def_index = 0;
    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim_start();
        if stripped.starts_with("def ") || stripped.starts_with("async def ") {
            func_indent = leading_whitespace(line).to_string();
            def_index = i;
            break;
        }
    }

    let body_start = body_start_index(&lines[def_index..]) + def_index;
    let body_indent = format!("{func_indent}    ");

    let mut out: Vec<String> = lines[..body_start].iter().map(|s| s.to_string()).collect();
    out.push(format!("{body_indent}try:"));
    for body_line in &lines[body_start..] {
        out.push(format!("    {body_line}"));
    }
    out.push(format!("{body_indent}except Exception:"));
    out.push(format!(
        "{body_indent}    logging.exception(\"Error in {func_name}\")"
    ));
    out.push(format!("{body_indent}    raise"));
    out.join("\n")
}

/// Index of the first body line after the `def` line and any docstring.
fn body_start_index(lines: &[&str]) -> usize {
    let mut body_start = 0;
    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim_start();
        if stripped.starts_with("def ") || stripped.starts_with("async def ") {
            body_start = i + 1;
            break;
        }
    }

    if let Some(line) = lines.get(body_start) {
        let stripped = line.trim();
        for quote in ["\"\"\"", "'''"] {
            if !stripped.starts_with(quote) {
                continue;
            }
            if stripped.len() >= 6 && stripped[3..].contains(quote) {
                return body_start + 1;
            }
            for (j, later) in lines.iter().enumerate().skip(body_start + 1) {
                if later.contains(quote) {
                    return j + 1;
                }
            }
        }
    }

    body_start.min(lines.len())
}
