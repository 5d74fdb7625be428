//! Schema versions for the store database.
//!
//! The applied version lives in `PRAGMA user_version`. Each step runs in
//! its own transaction together with the version bump, so a failed step
//! leaves both the schema and the recorded version where they were.

use tokio_rusqlite::{Connection, rusqlite};

use crate::Error;

pub(crate) struct Migration {
    pub version: i64,
    pub sql: &'static str,
}

pub(crate) const MIGRATIONS: &[Migration] =
    &[Migration { version: 1, sql: include_str!("../../../migrations/001_stores.sql") }];

/// Bring the schema up to the newest version. Returns the version now applied.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the step whose SQL failed.
pub async fn run(conn: &Connection) -> Result<i64, Error> {
    conn.call(|conn| apply(conn, MIGRATIONS)).await.map_err(Error::from)
}

fn apply(conn: &mut rusqlite::Connection, migrations: &[Migration]) -> Result<i64, Error> {
    let mut applied: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    for step in migrations.iter().filter(move |m| m.version > applied) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)
            .map_err(|e| Error::MigrationFailed(format!("version {}: {e}", step.version)))?;
        tx.pragma_update(None, "user_version", step.version)?;
        tx.commit()?;

        applied = step.version;
        tracing::debug!(version = applied, "applied store migration");
    }

    Ok(applied)
}
