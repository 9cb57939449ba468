//! SQL DDL for initializing the shared record store (SQLite).

/// One row per `(namespace, name)` record; `data` is a JSON object of strings and
/// `version` is bumped on every successful write.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS shared_records (
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}', -- JSON object
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL, -- RFC3339
    PRIMARY KEY (namespace, name)
);
"#;
