//! libSQL backend — async `ReportStore` implementation.
//!
//! Supports local file and in-memory databases. Quantities are stored as
//! decimal text so they round-trip exactly.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, Row, params};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::report::{FuelReport, ReportRecord};
use crate::store::migrations;
use crate::store::traits::{DateRange, ReportStore};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn query_reports(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        op: &str,
    ) -> Result<Vec<FuelReport>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut reports = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            reports.push(row_to_report(&row)?);
        }
        Ok(reports)
    }
}

// ── Helper functions ────────────────────────────────────────────────

const REPORT_COLUMNS: &str = "id, telegram_user_id, captain_name, boat_name, program_name, \
    private_program, departure_pier, departure_date, return_date, refill_date, max_speed, \
    gasoline_refuel, total_gasoline, gasoline_used, gasoline_left, mileage_ride, \
    mileage_photo_id, bill_photo_id, created_at";

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Query(format!("Bad date '{s}' in reports: {e}")))
}

fn parse_decimal(s: &str) -> Result<Decimal, DatabaseError> {
    Decimal::from_str(s)
        .map_err(|e| DatabaseError::Query(format!("Bad quantity '{s}' in reports: {e}")))
}

fn date_text(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Convert `Option<String>` to libsql Value.
fn opt_text_owned(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn sql_limit(limit: usize) -> i64 {
    // SQLite treats a negative LIMIT as unbounded.
    i64::try_from(limit).unwrap_or(-1)
}

fn row_to_report(row: &Row) -> Result<FuelReport, DatabaseError> {
    let col = |i: i32, name: &str| {
        row.get::<String>(i)
            .map_err(|e| DatabaseError::Query(format!("Failed to read {name}: {e}")))
    };

    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("Failed to read id: {e}")))?;
    let user_id: i64 = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("Failed to read user id: {e}")))?;
    let max_speed: i64 = row
        .get(10)
        .map_err(|e| DatabaseError::Query(format!("Failed to read max_speed: {e}")))?;
    let mileage = match row.get::<String>(15).ok() {
        Some(s) => Some(parse_decimal(&s)?),
        None => None,
    };

    Ok(FuelReport {
        id,
        created_at: parse_datetime(&col(18, "created_at")?),
        record: ReportRecord {
            user_id,
            captain: col(2, "captain_name")?,
            boat: col(3, "boat_name")?,
            program: col(4, "program_name")?,
            private_program: row.get::<String>(5).ok(),
            pier: col(6, "departure_pier")?,
            departure_date: parse_date(&col(7, "departure_date")?)?,
            return_date: parse_date(&col(8, "return_date")?)?,
            refill_date: parse_date(&col(9, "refill_date")?)?,
            max_speed,
            gasoline_refuel: parse_decimal(&col(11, "gasoline_refuel")?)?,
            total_gasoline: parse_decimal(&col(12, "total_gasoline")?)?,
            gasoline_used: parse_decimal(&col(13, "gasoline_used")?)?,
            gasoline_left: parse_decimal(&col(14, "gasoline_left")?)?,
            mileage,
            mileage_photo_id: row.get::<String>(16).ok(),
            bill_photo_id: row.get::<String>(17).ok(),
        },
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ReportStore for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn insert_report(&self, record: &ReportRecord) -> Result<FuelReport, DatabaseError> {
        let created_at = Utc::now();
        let mut rows = self
            .conn()
            .query(
                "INSERT INTO reports (telegram_user_id, captain_name, boat_name, program_name,
                    private_program, departure_pier, departure_date, return_date, refill_date,
                    max_speed, gasoline_refuel, total_gasoline, gasoline_used, gasoline_left,
                    mileage_ride, mileage_photo_id, bill_photo_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                 RETURNING id",
                params![
                    record.user_id,
                    record.captain.clone(),
                    record.boat.clone(),
                    record.program.clone(),
                    opt_text_owned(record.private_program.clone()),
                    record.pier.clone(),
                    date_text(record.departure_date),
                    date_text(record.return_date),
                    date_text(record.refill_date),
                    record.max_speed,
                    record.gasoline_refuel.to_string(),
                    record.total_gasoline.to_string(),
                    record.gasoline_used.to_string(),
                    record.gasoline_left.to_string(),
                    opt_text_owned(record.mileage.map(|m| m.to_string())),
                    opt_text_owned(record.mileage_photo_id.clone()),
                    opt_text_owned(record.bill_photo_id.clone()),
                    created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_report: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_report: {e}")))?
            .ok_or_else(|| DatabaseError::Query("insert_report: no id returned".into()))?;
        let id: i64 = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("insert_report: {e}")))?;

        debug!(report_id = id, user_id = record.user_id, boat = %record.boat, "Report inserted");
        Ok(FuelReport {
            id,
            created_at,
            record: record.clone(),
        })
    }

    async fn get_report(&self, id: i64) -> Result<Option<FuelReport>, DatabaseError> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1");
        let mut reports = self.query_reports(&sql, params![id], "get_report").await?;
        Ok(reports.pop())
    }

    async fn list_reports_by_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<FuelReport>, DatabaseError> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE telegram_user_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        self.query_reports(&sql, params![user_id, sql_limit(limit)], "list_reports_by_user")
            .await
    }

    async fn list_reports_in_range(&self, range: DateRange) -> Result<Vec<FuelReport>, DatabaseError> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports
             WHERE departure_date >= ?1 AND departure_date <= ?2
             ORDER BY departure_date DESC, id DESC"
        );
        self.query_reports(
            &sql,
            params![date_text(range.start), date_text(range.end)],
            "list_reports_in_range",
        )
        .await
    }

    async fn list_all_reports(&self, limit: usize) -> Result<Vec<FuelReport>, DatabaseError> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY departure_date DESC, id DESC LIMIT ?1"
        );
        self.query_reports(&sql, params![sql_limit(limit)], "list_all_reports")
            .await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::store::{GroupBy, ReportStore};

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn record(user_id: i64, captain: &str, boat: &str, departure: u32, used: Decimal) -> ReportRecord {
        ReportRecord {
            user_id,
            captain: captain.into(),
            boat: boat.into(),
            program: "Snorkel".into(),
            private_program: None,
            pier: "Dock1".into(),
            departure_date: day(departure),
            return_date: day(departure),
            refill_date: day(departure),
            max_speed: 30,
            gasoline_refuel: dec!(50),
            total_gasoline: dec!(200),
            gasoline_used: used,
            gasoline_left: dec!(200) - used,
            mileage: None,
            mileage_photo_id: None,
            bill_photo_id: None,
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let db = test_db().await;
        let mut rec = record(7, "Alice", "Orca", 10, dec!(80.5));
        rec.private_program = Some("Island Tour".into());
        rec.mileage = Some(dec!(12.3));
        rec.bill_photo_id = Some("photo-1".into());

        let saved = db.insert_report(&rec).await.unwrap();
        assert!(saved.id > 0);

        let loaded = db.get_report(saved.id).await.unwrap().unwrap();
        assert_eq!(loaded.record, rec);
        assert_eq!(loaded.record.gasoline_left, dec!(119.5));
        assert_eq!(loaded.created_at.timestamp(), saved.created_at.timestamp());
    }

    #[tokio::test]
    async fn get_missing_report() {
        let db = test_db().await;
        assert!(db.get_report(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_by_user_newest_first_with_limit() {
        let db = test_db().await;
        for d in 1..=7 {
            db.insert_report(&record(7, "Alice", "Orca", d, dec!(10))).await.unwrap();
        }
        db.insert_report(&record(8, "Bob", "Orca", 3, dec!(10))).await.unwrap();

        let reports = db.list_reports_by_user(7, 5).await.unwrap();
        assert_eq!(reports.len(), 5);
        assert!(reports.iter().all(|r| r.record.user_id == 7));
        assert!(reports[0].id > reports[4].id);
    }

    #[tokio::test]
    async fn range_filter_is_inclusive() {
        let db = test_db().await;
        for d in [1, 5, 10, 15] {
            db.insert_report(&record(7, "Alice", "Orca", d, dec!(10))).await.unwrap();
        }
        let reports = db
            .list_reports_in_range(DateRange::new(day(5), day(10)))
            .await
            .unwrap();
        let days: Vec<_> = reports.iter().map(|r| r.record.departure_date).collect();
        assert_eq!(days, vec![day(10), day(5)]);
    }

    #[tokio::test]
    async fn group_stats_by_boat() {
        let db = test_db().await;
        db.insert_report(&record(1, "Alice", "Orca", 1, dec!(80))).await.unwrap();
        db.insert_report(&record(1, "Alice", "Orca", 2, dec!(100))).await.unwrap();
        db.insert_report(&record(2, "Bob", "Marlin", 3, dec!(45.25))).await.unwrap();

        let stats = db.group_stats(GroupBy::Boat, None).await.unwrap();
        assert_eq!(stats.len(), 2);
        let orca = stats.iter().find(|s| s.name == "Orca").unwrap();
        assert_eq!(orca.trips, 2);
        assert_eq!(orca.avg_fuel_used, dec!(90));
        assert_eq!(orca.total_fuel_used, dec!(180));
        assert_eq!(orca.avg_speed, dec!(30));
        assert_eq!(orca.total_refuel, dec!(100));
        let marlin = stats.iter().find(|s| s.name == "Marlin").unwrap();
        assert_eq!(marlin.avg_fuel_used, dec!(45.2));
    }

    #[tokio::test]
    async fn group_stats_respects_range() {
        let db = test_db().await;
        db.insert_report(&record(1, "Alice", "Orca", 1, dec!(80))).await.unwrap();
        db.insert_report(&record(2, "Bob", "Orca", 20, dec!(40))).await.unwrap();

        let stats = db
            .group_stats(GroupBy::Captain, Some(DateRange::new(day(15), day(25))))
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "Bob");
    }

    #[tokio::test]
    async fn period_summary_totals() {
        let db = test_db().await;
        db.insert_report(&record(1, "Alice", "Orca", 1, dec!(80))).await.unwrap();
        db.insert_report(&record(2, "Bob", "Marlin", 2, dec!(40))).await.unwrap();

        let summary = db
            .period_summary(DateRange::new(day(1), day(31)))
            .await
            .unwrap();
        assert_eq!(summary.total_trips, 2);
        assert_eq!(summary.total_fuel_used, dec!(120));
        assert_eq!(summary.total_refuel, dec!(100));
        assert_eq!(summary.avg_fuel_per_trip, dec!(60));
        assert_eq!(summary.avg_speed, dec!(30));
    }

    #[tokio::test]
    async fn empty_period_summary() {
        let db = test_db().await;
        let summary = db
            .period_summary(DateRange::new(day(1), day(2)))
            .await
            .unwrap();
        assert_eq!(summary.total_trips, 0);
        assert_eq!(summary.avg_fuel_per_trip, Decimal::ZERO);
    }

    #[tokio::test]
    async fn oversized_totals_are_an_error() {
        let db = test_db().await;
        db.insert_report(&record(1, "Alice", "Orca", 1, Decimal::MAX)).await.unwrap();
        db.insert_report(&record(2, "Bob", "Orca", 2, Decimal::MAX)).await.unwrap();

        let err = db.group_stats(GroupBy::Boat, None).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Aggregate(_)));
        let err = db
            .period_summary(DateRange::new(day(1), day(31)))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Aggregate(_)));
    }

    #[tokio::test]
    async fn local_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reports.db");
        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.insert_report(&record(1, "Alice", "Orca", 1, dec!(10))).await.unwrap();
        }
        let db = LibSqlBackend::new_local(&path).await.unwrap();
        assert_eq!(db.list_all_reports(10).await.unwrap().len(), 1);
    }
}
