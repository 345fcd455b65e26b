//! Fixed name tables for the rule catalog and the structural validator.
//!
//! Every rule's set of suspect call names lives here as data, keyed by the
//! dotted call-expression string the parser produces. Matching is exact on
//! that representation except where a table is documented as a substring or
//! prefix set.

use std::sync::LazyLock;

use codemend_core::{FxHashMap, FxHashSet, Severity};

/// Case-insensitive substrings that mark a decorator as a request handler.
pub const ENTRY_POINT_DECORATOR_PATTERNS: &[&str] = &[
    "app.get",
    "app.post",
    "app.put",
    "app.delete",
    "app.patch",
    "app.route",
    "router.",
    "blueprint.route",
    "route",
    "get",
    "post",
    "put",
    "delete",
    "patch",
];

/// Name prefixes that mark an async function as an implicit entry point.
pub const ENTRY_POINT_NAME_PREFIXES: &[&str] = &["handle_", "on_", "process_", "endpoint_"];

/// Filesystem and process calls that must never receive raw parameters,
/// with the severity of a tainted use.
pub static DANGEROUS_IO_CALLS: LazyLock<FxHashMap<&'static str, Severity>> =
    LazyLock::new(|| {
        FxHashMap::from_iter([
            ("open", Severity::High),
            ("os.open", Severity::High),
            ("os.remove", Severity::Critical),
            ("os.unlink", Severity::Critical),
            ("os.rmdir", Severity::Critical),
            ("os.makedirs", Severity::Medium),
            ("shutil.rmtree", Severity::Critical),
            ("shutil.copy", Severity::High),
            ("shutil.move", Severity::High),
            ("subprocess.run", Severity::Critical),
            ("subprocess.call", Severity::Critical),
            ("subprocess.Popen", Severity::Critical),
            ("subprocess.check_output", Severity::Critical),
            ("subprocess.check_call", Severity::Critical),
            ("os.system", Severity::Critical),
        ])
    });

/// Functions that execute arbitrary code. Matching is on the bare last
/// segment, so `builtins.eval` still counts.
pub static DANGEROUS_EVAL_FUNCTIONS: LazyLock<FxHashSet<&'static str>> =
    LazyLock::new(|| FxHashSet::from_iter(["eval", "exec", "compile", "__import__"]));

/// Network client calls a retry loop is expected to back off around.
/// Substring matching, so `client.chat.completions.create` variants count.
pub const NETWORK_CALLS: &[&str] = &[
    "requests.get",
    "requests.post",
    "requests.put",
    "requests.delete",
    "requests.patch",
    "requests.head",
    "requests.request",
    "httpx.get",
    "httpx.post",
    "httpx.put",
    "httpx.delete",
    "httpx.request",
    "httpx.AsyncClient",
    "aiohttp.ClientSession",
    "urllib.request.urlopen",
    "client.chat.completions.create",
    "openai.ChatCompletion.create",
];

/// Call-name substrings that indicate backoff or retry tooling is present.
pub const BACKOFF_INDICATORS: &[&str] = &[
    "time.sleep",
    "asyncio.sleep",
    "sleep",
    "backoff",
    "tenacity",
    "retry",
    "exponential_backoff",
];

/// Blocking calls that stall an event loop, with the async replacement.
/// Shared by the `blocking_io_in_async` rule and validator check 6.
pub static BLOCKING_CALLS: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        FxHashMap::from_iter([
            ("time.sleep", "Use asyncio.sleep() instead"),
            ("requests.get", "Use httpx.AsyncClient or aiohttp instead"),
            ("requests.post", "Use httpx.AsyncClient or aiohttp instead"),
            ("requests.put", "Use httpx.AsyncClient or aiohttp instead"),
            ("requests.delete", "Use httpx.AsyncClient or aiohttp instead"),
            ("requests.patch", "Use httpx.AsyncClient or aiohttp instead"),
            ("requests.head", "Use httpx.AsyncClient or aiohttp instead"),
            ("requests.request", "Use httpx.AsyncClient or aiohttp instead"),
            ("urllib.request.urlopen", "Use httpx.AsyncClient or aiohttp instead"),
            ("open", "Use aiofiles.open() instead"),
            ("input", "Use aioconsole.ainput() instead"),
            ("os.system", "Use asyncio.create_subprocess_shell() instead"),
            ("subprocess.run", "Use asyncio.create_subprocess_exec() instead"),
            ("subprocess.call", "Use asyncio.create_subprocess_exec() instead"),
            ("subprocess.check_output", "Use asyncio.create_subprocess_exec() instead"),
        ])
    });

/// Database connection constructors that must be pooled, with the fix.
pub static DB_CONNECT_CALLS: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        FxHashMap::from_iter([
            (
                "sqlite3.connect",
                "Use a connection pool (e.g. sqlalchemy.create_engine with pool_size)",
            ),
            (
                "psycopg2.connect",
                "Use psycopg2.pool.SimpleConnectionPool or SQLAlchemy pooling",
            ),
            (
                "pymysql.connect",
                "Use SQLAlchemy connection pooling or DBUtils.PooledDB",
            ),
            (
                "mysql.connector.connect",
                "Use mysql.connector.pooling.MySQLConnectionPool",
            ),
            ("cx_Oracle.connect", "Use cx_Oracle.SessionPool"),
            (
                "pymongo.MongoClient",
                "Instantiate MongoClient once at module level, not per request",
            ),
            (
                "redis.Redis",
                "Use a shared Redis connection pool (redis.ConnectionPool)",
            ),
            (
                "redis.StrictRedis",
                "Use a shared Redis connection pool (redis.ConnectionPool)",
            ),
        ])
    });

/// Decorator substrings that mark a function as a request handler.
pub const HANDLER_DECORATORS: &[&str] = &[
    "app.get",
    "app.post",
    "app.put",
    "app.delete",
    "app.patch",
    "router.get",
    "router.post",
    "router.put",
    "router.delete",
    "router.patch",
    "route",
    "get",
    "post",
    "put",
    "delete",
    "app.route",
    "blueprint.route",
];

/// Decorator substrings that mark a mutating (POST/PUT/PATCH) handler.
pub const MUTATING_DECORATORS: &[&str] = &[
    "app.post",
    "app.put",
    "app.patch",
    "router.post",
    "router.put",
    "router.patch",
    "post",
    "put",
    "patch",
    "blueprint.route",
];

/// Call-name substrings that indicate a write operation.
pub const WRITE_CALLS: &[&str] = &[
    "cursor.execute",
    "session.add",
    "session.commit",
    "session.flush",
    "db.session.add",
    "db.session.commit",
    "collection.insert_one",
    "collection.insert_many",
    "collection.update_one",
    "collection.update_many",
    "collection.replace_one",
    ".save",
    ".create",
    ".bulk_create",
    "requests.post",
    "requests.put",
    "requests.patch",
    "httpx.post",
    "httpx.put",
    "httpx.patch",
];

/// Body-text keywords that indicate idempotency protection. Matched
/// case-insensitively as substrings of the function body.
pub const IDEMPOTENCY_KEYWORDS: &[&str] = &[
    "idempotency_key",
    "idempotent",
    "if_not_exists",
    "get_or_create",
    "on conflict",
    "insert or ignore",
    "upsert",
    "replace into",
    "on_duplicate_key",
];

/// Call-name substrings that start or execute a transaction.
pub const TXN_CALLS: &[&str] = &[
    "cursor.execute",
    "cursor.executemany",
    "cursor.executescript",
    "session.add",
    "session.flush",
    "session.bulk_save_objects",
    "db.session.add",
    "db.session.flush",
    "connection.execute",
];

/// Call-name substrings that commit a transaction.
pub const COMMIT_CALLS: &[&str] = &[
    "commit",
    "session.commit",
    "connection.commit",
    "db.session.commit",
];

/// Call-name substrings that roll a transaction back.
pub const ROLLBACK_CALLS: &[&str] = &[
    "rollback",
    "session.rollback",
    "connection.rollback",
    "db.session.rollback",
];

/// HTTP client calls that must carry a `timeout=` keyword argument.
pub static HTTP_CALLS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    FxHashSet::from_iter([
        "requests.get",
        "requests.post",
        "requests.put",
        "requests.delete",
        "requests.patch",
        "requests.head",
        "requests.request",
        "httpx.get",
        "httpx.post",
        "httpx.put",
        "httpx.delete",
        "httpx.patch",
        "httpx.head",
        "httpx.request",
        "urllib.request.urlopen",
        "aiohttp.ClientSession.get",
        "aiohttp.ClientSession.post",
    ])
});

/// Import-module substrings a patch may never introduce.
pub const FORBIDDEN_IMPORTS: &[&str] = &[
    "os.system",
    "subprocess",
    "eval",
    "exec",
    "compile",
    "__import__",
    "importlib",
    "ctypes",
    "pickle",
];

/// Decorator keywords that mark a routing decorator the validator must
/// preserve (check 3).
pub const ROUTE_DECORATOR_KEYWORDS: &[&str] =
    &["route", "get", "post", "put", "delete", "patch", "head"];

/// Whether any table entry is a substring of `name`.
pub fn matches_any_substring(name: &str, table: &[&str]) -> bool {
    table.iter().any(|entry| name.contains(entry))
}

/// Whether any decorator matches a substring table after lowercasing and
/// stripping the `@` sigil.
pub fn decorator_matches(decorators: &[String], table: &[&str]) -> bool {
    decorators.iter().any(|d| {
        let dl = d.to_lowercase();
        let dl = dl.trim_start_matches('@');
        table.iter().any(|entry| dl.contains(entry))
    })
}
