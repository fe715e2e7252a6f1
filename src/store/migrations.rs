//! Schema versions for the report database.
//!
//! Versions are recorded in `_migrations`; on open, every version above the
//! recorded one is applied in order, each inside its own transaction.

use libsql::Connection;

use crate::error::DatabaseError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Append only. Quantities are decimal text, dates ISO `YYYY-MM-DD`.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "reports",
        sql: r#"
            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_user_id INTEGER NOT NULL,
                captain_name TEXT NOT NULL,
                boat_name TEXT NOT NULL,
                program_name TEXT NOT NULL,
                private_program TEXT,
                departure_pier TEXT NOT NULL,
                departure_date TEXT NOT NULL,
                return_date TEXT NOT NULL,
                refill_date TEXT NOT NULL,
                max_speed INTEGER NOT NULL,
                gasoline_refuel TEXT NOT NULL,
                total_gasoline TEXT NOT NULL,
                gasoline_used TEXT NOT NULL,
                gasoline_left TEXT NOT NULL,
                mileage_ride TEXT,
                mileage_photo_id TEXT,
                bill_photo_id TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reports_user ON reports(telegram_user_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_reports_departure ON reports(departure_date);
        "#,
    },
    Migration {
        version: 2,
        name: "stats_indexes",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_reports_boat ON reports(boat_name, departure_date);
            CREATE INDEX IF NOT EXISTS idx_reports_captain ON reports(captain_name, departure_date);
        "#,
    },
];

fn migration_err(context: &str, e: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::Migration(format!("{context}: {e}"))
}

/// Bring the schema up to the latest version.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| migration_err("Failed to create _migrations table", e))?;

    let current = current_version(conn).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        tracing::debug!(version = current, "Database schema up to date");
        return Ok(());
    }

    for migration in pending {
        apply(conn, migration).await?;
    }
    let version = current_version(conn).await?;
    tracing::info!(version, "Database schema migrated");
    Ok(())
}

async fn apply(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    let label = format!("V{} ({})", migration.version, migration.name);
    tracing::info!(version = migration.version, name = migration.name, "Applying migration");

    let tx = conn
        .transaction()
        .await
        .map_err(|e| migration_err(&format!("{label}: begin"), e))?;
    tx.execute_batch(migration.sql)
        .await
        .map_err(|e| migration_err(&label, e))?;
    tx.execute(
        "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![migration.version, migration.name],
    )
    .await
    .map_err(|e| migration_err(&format!("{label}: record version"), e))?;
    tx.commit()
        .await
        .map_err(|e| migration_err(&format!("{label}: commit"), e))
}

/// Highest applied version, 0 for a fresh database.
async fn current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| migration_err("Failed to query schema version", e))?;
    match rows
        .next()
        .await
        .map_err(|e| migration_err("Failed to read schema version", e))?
    {
        Some(row) => row
            .get::<i64>(0)
            .map_err(|e| migration_err("Failed to parse schema version", e)),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    #[tokio::test]
    async fn migrations_create_reports_table() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        for table in &["reports", "_migrations"] {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    libsql::params![*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap().unwrap();
            let count: i64 = row.get(0).unwrap();
            assert_eq!(count, 1, "Table '{}' should exist", table);
        }
    }

    fn require_send<F: std::future::Future + Send>(future: F) -> F {
        future
    }

    #[tokio::test]
    async fn migration_future_can_cross_threads() {
        let conn = test_conn().await;
        require_send(run_migrations(&conn)).await.unwrap();
        assert_eq!(current_version(&conn).await.unwrap(), MIGRATIONS.last().unwrap().version);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();

        let version = current_version(&conn).await.unwrap();
        assert_eq!(version, MIGRATIONS.last().unwrap().version);
    }

    #[tokio::test]
    async fn every_version_is_recorded() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM _migrations", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count as usize, MIGRATIONS.len());
    }

    #[tokio::test]
    async fn partially_migrated_db_catches_up() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        conn.execute("DELETE FROM _migrations WHERE version > 1", ())
            .await
            .unwrap();
        run_migrations(&conn).await.unwrap();
        assert_eq!(
            current_version(&conn).await.unwrap(),
            MIGRATIONS.last().unwrap().version
        );
    }

    #[tokio::test]
    async fn fresh_db_starts_at_zero() {
        let conn = test_conn().await;
        conn.execute(
            "CREATE TABLE _migrations (version INTEGER PRIMARY KEY, name TEXT NOT NULL, applied_at TEXT)",
            (),
        )
        .await
        .unwrap();
        assert_eq!(current_version(&conn).await.unwrap(), 0);
    }
}
