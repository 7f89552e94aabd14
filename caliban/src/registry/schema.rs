//! Schema creation and additive migration: schema evolution happens by adding columns with
//! default values, gated by a `schema_version` row; nothing here ever drops a table or column.

use rusqlite::Connection;

use crate::error::CalibanError;

const CURRENT_VERSION: i64 = 1;

pub fn migrate(conn: &Connection) -> Result<(), CalibanError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);

         CREATE TABLE IF NOT EXISTS experiment_groups (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL UNIQUE,
             created_at TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS containers (
             id INTEGER PRIMARY KEY,
             image_reference TEXT NOT NULL UNIQUE,
             mode TEXT NOT NULL,
             build_context_path TEXT NOT NULL,
             extra_dirs TEXT NOT NULL,
             created_at TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS experiments (
             id INTEGER PRIMARY KEY,
             group_id INTEGER NOT NULL REFERENCES experiment_groups(id),
             container_id INTEGER NOT NULL REFERENCES containers(id),
             module_spec TEXT NOT NULL,
             args TEXT NOT NULL,
             kwargs TEXT NOT NULL,
             created_at TEXT NOT NULL,
             UNIQUE(group_id, container_id, module_spec, args, kwargs)
         );

         CREATE TABLE IF NOT EXISTS jobs (
             id INTEGER PRIMARY KEY,
             experiment_id INTEGER NOT NULL REFERENCES experiments(id),
             backend TEXT NOT NULL,
             backend_handle TEXT NOT NULL,
             details TEXT NOT NULL,
             created_at TEXT NOT NULL,
             status TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS job_status_history (
             id INTEGER PRIMARY KEY,
             job_id INTEGER NOT NULL REFERENCES jobs(id),
             status TEXT NOT NULL,
             observed_at TEXT NOT NULL,
             message TEXT
         );",
    )?;

    let version: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))?;
    if version < CURRENT_VERSION {
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [CURRENT_VERSION])?;
    }

    Ok(())
}
