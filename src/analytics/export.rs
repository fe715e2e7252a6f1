//! CSV exports. Files start with a UTF-8 byte order mark so spreadsheet
//! tools detect the encoding.

use chrono::NaiveDate;

use crate::channels::{Attachment, AttachmentKind};
use crate::error::ReportError;
use crate::report::FuelReport;
use crate::store::GroupStats;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const REPORT_HEADERS: [&str; 15] = [
    "Date",
    "Captain",
    "Boat",
    "Program",
    "Private Tour",
    "Pier",
    "Departure",
    "Return",
    "Refill Date",
    "Max Speed",
    "Refueled (L)",
    "Total Fuel (L)",
    "Used (L)",
    "Remaining (L)",
    "Mileage",
];

const STATS_HEADERS: [&str; 6] = [
    "Trips",
    "Avg Consumption (L)",
    "Total Consumed (L)",
    "Avg Speed",
    "Avg Refuel (L)",
    "Total Refueled (L)",
];

/// What to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Reports,
    Boats,
    Captains,
}

impl ExportKind {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "reports" => Some(Self::Reports),
            "boats" => Some(Self::Boats),
            "captains" => Some(Self::Captains),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Reports => "reports",
            Self::Boats => "boats",
            Self::Captains => "captains",
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            Self::Reports => "📋 All fuel reports",
            Self::Boats => "🚤 Boat statistics",
            Self::Captains => "👨‍✈️ Captain statistics",
        }
    }

    pub fn file_name(&self, today: NaiveDate) -> String {
        let stem = match self {
            Self::Reports => "fuel_reports",
            Self::Boats => "boat_stats",
            Self::Captains => "captain_stats",
        };
        format!("{stem}_{}.csv", today.format("%Y%m%d"))
    }
}

fn export_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Export(e.to_string())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ReportError> {
    writer.into_inner().map_err(export_err)
}

fn new_writer() -> csv::Writer<Vec<u8>> {
    csv::Writer::from_writer(UTF8_BOM.to_vec())
}

fn dmy(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// One row per report.
pub fn reports_csv(reports: &[FuelReport]) -> Result<Vec<u8>, ReportError> {
    let mut writer = new_writer();
    writer.write_record(REPORT_HEADERS).map_err(export_err)?;
    for r in reports {
        let rec = &r.record;
        writer
            .write_record([
                dmy(rec.departure_date),
                rec.captain.clone(),
                rec.boat.clone(),
                rec.program.clone(),
                rec.private_program.clone().unwrap_or_default(),
                rec.pier.clone(),
                dmy(rec.departure_date),
                dmy(rec.return_date),
                dmy(rec.refill_date),
                rec.max_speed.to_string(),
                rec.gasoline_refuel.to_string(),
                rec.total_gasoline.to_string(),
                rec.gasoline_used.to_string(),
                rec.gasoline_left.to_string(),
                rec.mileage.map(|m| m.to_string()).unwrap_or_default(),
            ])
            .map_err(export_err)?;
    }
    finish(writer)
}

/// One row per group. `name_header` labels the first column.
pub fn stats_csv(name_header: &str, stats: &[GroupStats]) -> Result<Vec<u8>, ReportError> {
    let mut writer = new_writer();
    let headers: Vec<&str> = std::iter::once(name_header)
        .chain(STATS_HEADERS)
        .collect();
    writer.write_record(&headers).map_err(export_err)?;
    for s in stats {
        writer
            .write_record([
                s.name.clone(),
                s.trips.to_string(),
                s.avg_fuel_used.to_string(),
                s.total_fuel_used.to_string(),
                s.avg_speed.to_string(),
                s.avg_refuel.to_string(),
                s.total_refuel.to_string(),
            ])
            .map_err(export_err)?;
    }
    finish(writer)
}

/// Wrap exported bytes as a document for the channel.
pub fn attachment(kind: ExportKind, bytes: Vec<u8>, today: NaiveDate) -> Attachment {
    Attachment {
        kind: AttachmentKind::Document,
        file_name: kind.file_name(today),
        bytes,
        caption: Some(format!(
            "{}\n\n_Import to Google Sheets: File → Import → Upload_",
            kind.caption()
        )),
    }
}
