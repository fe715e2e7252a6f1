//! `ReportStore` trait — async interface for report persistence and
//! aggregate queries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::DatabaseError;
use crate::report::{FuelReport, ReportRecord};

/// Inclusive range of departure dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Grouping key for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Boat,
    Captain,
    Program,
}

impl GroupBy {
    fn key<'a>(&self, report: &'a ReportRecord) -> &'a str {
        match self {
            Self::Boat => &report.boat,
            Self::Captain => &report.captain,
            Self::Program => &report.program,
        }
    }
}

/// Per-group statistics. Averages and totals are rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStats {
    pub name: String,
    pub trips: usize,
    pub avg_fuel_used: Decimal,
    pub total_fuel_used: Decimal,
    pub avg_speed: Decimal,
    pub avg_refuel: Decimal,
    pub total_refuel: Decimal,
}

/// Totals over a period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodSummary {
    pub total_trips: usize,
    pub total_fuel_used: Decimal,
    pub total_refuel: Decimal,
    pub avg_fuel_per_trip: Decimal,
    pub avg_speed: Decimal,
}

fn avg(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(count as u64)
    }
}

/// Sum quantities, failing instead of overflowing.
pub fn checked_total(
    values: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal, DatabaseError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| DatabaseError::Aggregate(format!("{what} total is out of range")))
}

/// Group reports and compute their statistics, ordered by name.
pub fn aggregate_groups(
    reports: &[FuelReport],
    by: GroupBy,
) -> Result<Vec<GroupStats>, DatabaseError> {
    let mut groups: BTreeMap<&str, Vec<&ReportRecord>> = BTreeMap::new();
    for report in reports {
        groups
            .entry(by.key(&report.record))
            .or_default()
            .push(&report.record);
    }

    groups
        .into_iter()
        .map(|(name, records)| {
            let trips = records.len();
            let total_fuel_used = checked_total(records.iter().map(|r| r.gasoline_used), "fuel used")?;
            let total_refuel = checked_total(records.iter().map(|r| r.gasoline_refuel), "refuel")?;
            let total_speed =
                checked_total(records.iter().map(|r| Decimal::from(r.max_speed)), "speed")?;
            Ok(GroupStats {
                name: name.to_string(),
                trips,
                avg_fuel_used: avg(total_fuel_used, trips).round_dp(1),
                total_fuel_used: total_fuel_used.round_dp(1),
                avg_speed: avg(total_speed, trips).round_dp(1),
                avg_refuel: avg(total_refuel, trips).round_dp(1),
                total_refuel: total_refuel.round_dp(1),
            })
        })
        .collect()
}

/// Totals across all given reports.
pub fn summarize(reports: &[FuelReport]) -> Result<PeriodSummary, DatabaseError> {
    let total_trips = reports.len();
    let total_fuel_used = checked_total(reports.iter().map(|r| r.record.gasoline_used), "fuel used")?;
    let total_refuel = checked_total(reports.iter().map(|r| r.record.gasoline_refuel), "refuel")?;
    let total_speed = checked_total(
        reports.iter().map(|r| Decimal::from(r.record.max_speed)),
        "speed",
    )?;
    Ok(PeriodSummary {
        total_trips,
        total_fuel_used: total_fuel_used.round_dp(1),
        total_refuel: total_refuel.round_dp(1),
        avg_fuel_per_trip: avg(total_fuel_used, total_trips).round_dp(1),
        avg_speed: avg(total_speed, total_trips).round_dp(1),
    })
}

/// Backend-agnostic report persistence.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Create tables and run migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Persist a validated report and return it with its id and timestamp.
    async fn insert_report(&self, record: &ReportRecord) -> Result<FuelReport, DatabaseError>;

    async fn get_report(&self, id: i64) -> Result<Option<FuelReport>, DatabaseError>;

    /// A user's reports, most recently created first.
    async fn list_reports_by_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<FuelReport>, DatabaseError>;

    /// Reports departing within the range, latest departure first.
    async fn list_reports_in_range(&self, range: DateRange) -> Result<Vec<FuelReport>, DatabaseError>;

    /// All reports, latest departure first.
    async fn list_all_reports(&self, limit: usize) -> Result<Vec<FuelReport>, DatabaseError>;

    /// Statistics per boat, captain or program, optionally limited to a range.
    async fn group_stats(
        &self,
        by: GroupBy,
        range: Option<DateRange>,
    ) -> Result<Vec<GroupStats>, DatabaseError> {
        let reports = match range {
            Some(range) => self.list_reports_in_range(range).await?,
            None => self.list_all_reports(usize::MAX).await?,
        };
        aggregate_groups(&reports, by)
    }

    async fn period_summary(&self, range: DateRange) -> Result<PeriodSummary, DatabaseError> {
        let reports = self.list_reports_in_range(range).await?;
        summarize(&reports)
    }
}
