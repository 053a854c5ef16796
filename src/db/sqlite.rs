use std::path::Path;

use rusqlite::Connection;
use tracing;

use super::StoreError;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY,
    baseline TEXT NOT NULL,
    start_date TEXT NOT NULL,
    voice_cadence TEXT NOT NULL,
    symptom_cadence TEXT NOT NULL,
    environment_sensor INTEGER NOT NULL,
    wearable_sensor INTEGER NOT NULL,
    visit_dates TEXT NOT NULL DEFAULT '',
    voice_staff TEXT NOT NULL,
    symptom_staff TEXT NOT NULL,
    environment_staff TEXT NOT NULL,
    wearable_staff TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS completions (
    patient_id TEXT NOT NULL,
    date TEXT NOT NULL,
    modality TEXT NOT NULL,
    result TEXT,
    PRIMARY KEY (patient_id, date, modality)
);

CREATE TABLE IF NOT EXISTS audio_links (
    patient_id TEXT NOT NULL,
    exam_date TEXT NOT NULL,
    link TEXT NOT NULL,
    PRIMARY KEY (patient_id, exam_date)
);

INSERT INTO schema_version (version) VALUES (1);
";

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(1, SCHEMA_V1)];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| StoreError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}
