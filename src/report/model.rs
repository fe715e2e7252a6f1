//! Report data: the in-progress draft, the validated record, and the
//! persisted report.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::step::{PRIVATE_TOUR_SENTINEL, Step};
use crate::error::ReportError;

/// A parsed answer to one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Integer(i64),
    Decimal(Decimal),
    /// Transport file id of an uploaded photo.
    Photo(String),
    /// An optional step the user skipped.
    Skipped,
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%d.%m.%Y")),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Photo(_) => f.write_str("uploaded"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// The report being filled in. Fields stay `None` until their step is
/// answered; going back never clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub captain: Option<String>,
    pub boat: Option<String>,
    pub program: Option<String>,
    pub private_program: Option<String>,
    pub pier: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub refill_date: Option<NaiveDate>,
    pub max_speed: Option<i64>,
    pub gasoline_refuel: Option<Decimal>,
    pub total_gasoline: Option<Decimal>,
    pub gasoline_used: Option<Decimal>,
    /// Always `total_gasoline - gasoline_used`; never entered directly.
    pub gasoline_left: Decimal,
    pub mileage: Option<Decimal>,
    pub mileage_photo_id: Option<String>,
    pub bill_photo_id: Option<String>,
}

impl ReportDraft {
    /// Store a step's value.
    pub fn apply(&mut self, step: Step, value: FieldValue) {
        use FieldValue as V;
        match (step, value) {
            (Step::Captain, V::Text(v)) => self.captain = Some(v),
            (Step::Boat, V::Text(v)) => self.boat = Some(v),
            (Step::Program, V::Text(v)) => {
                if v != PRIVATE_TOUR_SENTINEL {
                    self.private_program = None;
                }
                self.program = Some(v);
            }
            (Step::PrivateProgram, V::Text(v)) => self.private_program = Some(v),
            (Step::Pier, V::Text(v)) => self.pier = Some(v),
            (Step::DepartureDate, V::Date(d)) => self.departure_date = Some(d),
            (Step::ReturnDate, V::Date(d)) => self.return_date = Some(d),
            (Step::RefillDate, V::Date(d)) => self.refill_date = Some(d),
            (Step::MaxSpeed, V::Integer(n)) => self.max_speed = Some(n),
            (Step::GasolineRefuel, V::Decimal(d)) => self.gasoline_refuel = Some(d),
            (Step::TotalGasoline, V::Decimal(d)) => self.total_gasoline = Some(d),
            (Step::GasolineUsed, V::Decimal(d)) => {
                self.gasoline_used = Some(d);
                self.recalculate_remaining();
            }
            (Step::Mileage, V::Decimal(d)) => self.mileage = Some(d),
            (Step::Mileage, V::Skipped) => self.mileage = None,
            (Step::MileagePhoto, V::Photo(id)) => self.mileage_photo_id = Some(id),
            (Step::MileagePhoto, V::Skipped) => self.mileage_photo_id = None,
            (Step::BillPhoto, V::Photo(id)) => self.bill_photo_id = Some(id),
            (Step::BillPhoto, V::Skipped) => self.bill_photo_id = None,
            (step, value) => {
                tracing::warn!(%step, ?value, "Value does not fit step; ignored");
            }
        }
    }

    pub fn recalculate_remaining(&mut self) {
        self.gasoline_left =
            self.total_gasoline.unwrap_or_default() - self.gasoline_used.unwrap_or_default();
    }

    /// The stored value for a step, formatted for display.
    pub fn current_value(&self, step: Step) -> Option<String> {
        let date = |d: Option<NaiveDate>| d.map(|d| d.format("%d.%m.%Y").to_string());
        match step {
            Step::Captain => self.captain.clone(),
            Step::Boat => self.boat.clone(),
            Step::Program => self.program.clone(),
            Step::PrivateProgram => self.private_program.clone(),
            Step::Pier => self.pier.clone(),
            Step::DepartureDate => date(self.departure_date),
            Step::ReturnDate => date(self.return_date),
            Step::RefillDate => date(self.refill_date),
            Step::MaxSpeed => self.max_speed.map(|n| n.to_string()),
            Step::GasolineRefuel => self.gasoline_refuel.map(|d| d.to_string()),
            Step::TotalGasoline => self.total_gasoline.map(|d| d.to_string()),
            Step::GasolineUsed => self.gasoline_used.map(|d| d.to_string()),
            Step::Mileage => self.mileage.map(|d| d.to_string()),
            Step::MileagePhoto => self.mileage_photo_id.as_ref().map(|_| "uploaded".into()),
            Step::BillPhoto => self.bill_photo_id.as_ref().map(|_| "uploaded".into()),
            Step::Confirm => None,
        }
    }

    /// Program as shown in summaries: "Snorkel" or "N/A → Island Tour".
    pub fn program_display(&self) -> String {
        program_display(self.program.as_deref(), self.private_program.as_deref())
    }

    /// Names of required fields that are still empty (or a non-positive speed).
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.captain.is_none() {
            missing.push("captain");
        }
        if self.boat.is_none() {
            missing.push("boat");
        }
        if self.program.is_none() {
            missing.push("program");
        }
        if self.pier.is_none() {
            missing.push("pier");
        }
        if self.departure_date.is_none() {
            missing.push("departure date");
        }
        if self.return_date.is_none() {
            missing.push("return date");
        }
        if self.refill_date.is_none() {
            missing.push("refill date");
        }
        if !self.max_speed.is_some_and(|s| s > 0) {
            missing.push("max speed");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

pub(crate) fn program_display(program: Option<&str>, private: Option<&str>) -> String {
    match (program, private) {
        (Some(p), Some(route)) if p == PRIVATE_TOUR_SENTINEL => format!("{p} → {route}"),
        (Some(p), _) => p.to_string(),
        (None, _) => "—".to_string(),
    }
}

/// A complete, validated report ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub user_id: i64,
    pub captain: String,
    pub boat: String,
    pub program: String,
    pub private_program: Option<String>,
    pub pier: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub refill_date: NaiveDate,
    pub max_speed: i64,
    pub gasoline_refuel: Decimal,
    pub total_gasoline: Decimal,
    pub gasoline_used: Decimal,
    pub gasoline_left: Decimal,
    pub mileage: Option<Decimal>,
    pub mileage_photo_id: Option<String>,
    pub bill_photo_id: Option<String>,
}

impl ReportRecord {
    /// Validate a draft. Unanswered fuel quantities count as zero; the
    /// remaining amount is recomputed here.
    pub fn from_draft(user_id: i64, draft: &ReportDraft) -> Result<Self, ReportError> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(ReportError::Validation(missing));
        }

        let required = |v: &Option<String>| v.clone().unwrap_or_default();
        let total_gasoline = draft.total_gasoline.unwrap_or_default();
        let gasoline_used = draft.gasoline_used.unwrap_or_default();

        Ok(Self {
            user_id,
            captain: required(&draft.captain),
            boat: required(&draft.boat),
            program: required(&draft.program),
            private_program: draft.private_program.clone(),
            pier: required(&draft.pier),
            departure_date: draft.departure_date.unwrap_or_default(),
            return_date: draft.return_date.unwrap_or_default(),
            refill_date: draft.refill_date.unwrap_or_default(),
            max_speed: draft.max_speed.unwrap_or_default(),
            gasoline_refuel: draft.gasoline_refuel.unwrap_or_default(),
            total_gasoline,
            gasoline_used,
            gasoline_left: total_gasoline - gasoline_used,
            mileage: draft.mileage,
            mileage_photo_id: draft.mileage_photo_id.clone(),
            bill_photo_id: draft.bill_photo_id.clone(),
        })
    }

    pub fn program_display(&self) -> String {
        program_display(Some(&self.program), self.private_program.as_deref())
    }
}

/// A stored report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelReport {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: ReportRecord,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn complete_draft() -> ReportDraft {
        let mut draft = ReportDraft::default();
        draft.apply(Step::Captain, FieldValue::Text("Alice".into()));
        draft.apply(Step::Boat, FieldValue::Text("Orca".into()));
        draft.apply(Step::Program, FieldValue::Text("Snorkel".into()));
        draft.apply(Step::Pier, FieldValue::Text("Dock1".into()));
        draft.apply(Step::DepartureDate, FieldValue::Date(date(10)));
        draft.apply(Step::ReturnDate, FieldValue::Date(date(10)));
        draft.apply(Step::RefillDate, FieldValue::Date(date(10)));
        draft.apply(Step::MaxSpeed, FieldValue::Integer(30));
        draft.apply(Step::GasolineRefuel, FieldValue::Decimal(dec!(50)));
        draft.apply(Step::TotalGasoline, FieldValue::Decimal(dec!(200)));
        draft.apply(Step::GasolineUsed, FieldValue::Decimal(dec!(80)));
        draft
    }

    #[test]
    fn used_step_recomputes_remaining() {
        let draft = complete_draft();
        assert_eq!(draft.gasoline_left, dec!(120));
    }

    #[test]
    fn remaining_is_exact_for_decimals() {
        let mut draft = ReportDraft::default();
        draft.apply(Step::TotalGasoline, FieldValue::Decimal(dec!(0.3)));
        draft.apply(Step::GasolineUsed, FieldValue::Decimal(dec!(0.1)));
        assert_eq!(draft.gasoline_left, dec!(0.2));
    }

    #[test]
    fn remaining_may_go_negative() {
        let mut draft = ReportDraft::default();
        draft.apply(Step::TotalGasoline, FieldValue::Decimal(dec!(10)));
        draft.apply(Step::GasolineUsed, FieldValue::Decimal(dec!(25)));
        assert_eq!(draft.gasoline_left, dec!(-15));
    }

    #[test]
    fn choosing_regular_program_clears_private_route() {
        let mut draft = ReportDraft::default();
        draft.apply(Step::Program, FieldValue::Text(PRIVATE_TOUR_SENTINEL.into()));
        draft.apply(Step::PrivateProgram, FieldValue::Text("Island Tour".into()));
        assert_eq!(draft.program_display(), "N/A → Island Tour");

        draft.apply(Step::Program, FieldValue::Text("Sunset".into()));
        assert!(draft.private_program.is_none());
        assert_eq!(draft.program_display(), "Sunset");
    }

    #[test]
    fn skipping_clears_optional_values() {
        let mut draft = ReportDraft::default();
        draft.apply(Step::Mileage, FieldValue::Decimal(dec!(12.5)));
        draft.apply(Step::Mileage, FieldValue::Skipped);
        assert!(draft.mileage.is_none());

        draft.apply(Step::BillPhoto, FieldValue::Photo("f1".into()));
        assert_eq!(draft.current_value(Step::BillPhoto).as_deref(), Some("uploaded"));
    }

    #[test]
    fn mismatched_value_is_ignored() {
        let mut draft = ReportDraft::default();
        draft.apply(Step::MaxSpeed, FieldValue::Text("fast".into()));
        assert!(draft.max_speed.is_none());
    }

    #[test]
    fn current_value_formats_dates() {
        let draft = complete_draft();
        assert_eq!(
            draft.current_value(Step::DepartureDate).as_deref(),
            Some("10.01.2026")
        );
        assert!(draft.current_value(Step::Confirm).is_none());
    }

    #[test]
    fn record_from_complete_draft() {
        let record = ReportRecord::from_draft(7, &complete_draft()).unwrap();
        assert_eq!(record.user_id, 7);
        assert_eq!(record.captain, "Alice");
        assert_eq!(record.gasoline_left, dec!(120));
        assert!(record.mileage.is_none());
    }

    #[test]
    fn zero_speed_fails_validation() {
        let mut draft = complete_draft();
        draft.apply(Step::MaxSpeed, FieldValue::Integer(0));
        let err = ReportRecord::from_draft(7, &draft).unwrap_err();
        assert!(matches!(err, ReportError::Validation(ref f) if f == &vec!["max speed"]));
    }

    #[test]
    fn empty_draft_lists_all_required_fields() {
        let missing = ReportDraft::default().missing_fields();
        assert_eq!(missing.len(), 8);
        let err = ReportRecord::from_draft(1, &ReportDraft::default()).unwrap_err();
        assert!(err.to_string().starts_with("Not all required fields are filled"));
    }

    #[test]
    fn field_value_display() {
        assert_eq!(FieldValue::Date(date(5)).to_string(), "05.01.2026");
        assert_eq!(FieldValue::Skipped.to_string(), "skipped");
        assert_eq!(FieldValue::Photo("x".into()).to_string(), "uploaded");
    }
}
