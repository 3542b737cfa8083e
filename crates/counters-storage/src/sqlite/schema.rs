//! DDL statements and migrations for the SQLite schema.
//!
//! Timestamps are stored as TEXT in RFC 3339 form (SQLite has no native
//! datetime type). JSON payloads are TEXT. The `fact_index` table's
//! primary key is `(h, f)` -- the opaque/transparent index key together
//! with the owning fact's id -- since `h` alone already encodes the
//! index type the entry belongs to.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Facts table ----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS facts (
        id TEXT PRIMARY KEY,
        t  INTEGER NOT NULL,
        c  TEXT NOT NULL,
        d  TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_facts_t ON facts(t)",
    "CREATE INDEX IF NOT EXISTS idx_facts_c ON facts(c)",
    // -- Fact index table -------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS fact_index (
        h  TEXT NOT NULL,
        f  TEXT NOT NULL,
        it INTEGER NOT NULL,
        v  TEXT NOT NULL,
        t  INTEGER NOT NULL,
        dt TEXT NOT NULL,
        c  TEXT NOT NULL,
        d  TEXT,
        PRIMARY KEY (h, f),
        FOREIGN KEY (f) REFERENCES facts(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_fact_index_it_h ON fact_index(it, h)",
    "CREATE INDEX IF NOT EXISTS idx_fact_index_dt ON fact_index(dt)",
    "CREATE INDEX IF NOT EXISTS idx_fact_index_f ON fact_index(f)",
    // -- Debug log table --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS log (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        saved_at     TEXT NOT NULL,
        window_start INTEGER NOT NULL,
        window_end   INTEGER NOT NULL,
        worst_millis INTEGER NOT NULL,
        detail       TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_log_saved_at ON log(saved_at)",
    // -- Config / metadata tables -------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS config (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Schema migrations applied after initial DDL.
///
/// Each migration is a `(name, sql)` pair. Migrations are tracked in the
/// `metadata` table under the key `migration:<name>` so they run at most once.
pub const MIGRATIONS: &[(&str, &str)] = &[
    // Future migrations go here, e.g.:
    // ("001_add_foo_column", "ALTER TABLE facts ADD COLUMN foo TEXT DEFAULT ''"),
];
