use std::time::Duration;

use rusqlite::Connection;
use rusqlite::config::DbConfig;

use crate::config::StoreConfig;
use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

/// Per-connection settings. Must run before any statement on a new connection.
pub fn configure_connection(conn: &Connection, config: &StoreConfig) -> Result<(), StorageError> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    reject_double_quoted_strings(conn)?;
    // journal_mode answers with the resulting mode; read it so the row is consumed.
    conn.pragma_update_and_check(None, "journal_mode", &config.journal_mode, |row| {
        row.get::<_, String>(0)
    })?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
    Ok(())
}

/// Makes a double-quoted name that matches no column an error instead of a
/// string literal. Quoted identifiers are only safe with this off.
pub fn reject_double_quoted_strings(conn: &Connection) -> Result<(), StorageError> {
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DML, false)?;
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DDL, false)?;
    Ok(())
}

pub fn apply_project_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(PROJECT_SCHEMA_SQL)?;
    Ok(())
}

/// Tables of a project document. Identifiers are lower case; clients may
/// address them in any case.
pub const PROJECT_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS task (
    id TEXT PRIMARY KEY,
    uid TEXT,
    num INTEGER,
    name TEXT NOT NULL,
    color TEXT,
    shape TEXT,
    is_milestone INTEGER NOT NULL DEFAULT 0,
    is_project_task INTEGER NOT NULL DEFAULT 0,
    start_date TEXT,
    end_date TEXT,
    duration INTEGER,
    completion INTEGER,
    earliest_start_date TEXT,
    third_date_constraint INTEGER,
    priority TEXT,
    web_link TEXT,
    cost_manual_value REAL,
    is_cost_calculated INTEGER,
    notes TEXT
);
CREATE INDEX IF NOT EXISTS idx_task_num ON task (num);

CREATE TABLE IF NOT EXISTS task_dependency (
    dependee_id TEXT NOT NULL REFERENCES task (id) ON DELETE CASCADE,
    dependant_id TEXT NOT NULL REFERENCES task (id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    lag INTEGER NOT NULL DEFAULT 0,
    hardness TEXT NOT NULL DEFAULT 'Strong',
    PRIMARY KEY (dependee_id, dependant_id)
);
";
