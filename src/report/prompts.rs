//! User-facing text of the report flow.

use rust_decimal::Decimal;

use super::model::{FieldValue, ReportDraft};
use super::step::{FieldDef, PRIVATE_TOUR_SENTINEL, Step};

pub const NEW_REPORT_HEADER: &str = "📝 *New Fuel Report*";
pub const EDIT_HEADER: &str = "✏️ *Edit report*";
pub const CONFIRM_QUESTION: &str = "*Confirm submission?*";
pub const CANCELLED: &str = "❌ *Filling cancelled*\n\nUse the menu to start a new report.";
pub const SAVED: &str = "✅ *Report saved successfully!*\n\nThank you for filling out.";

/// Heading plus instruction line for a step.
pub fn step_prompt(def: &FieldDef) -> String {
    match def.hint {
        Some(hint) => format!("{}\n\n{hint}", def.title),
        None => def.title.to_string(),
    }
}

/// Confirmation line for an accepted value.
pub fn acknowledgement(def: &FieldDef, value: &FieldValue) -> String {
    match value {
        FieldValue::Skipped => format!("⏭ {}: *skipped*", def.label),
        FieldValue::Text(v) if def.step == Step::Program && v == PRIVATE_TOUR_SENTINEL => {
            format!("✅ {}: *{PRIVATE_TOUR_SENTINEL} (Private tour)*", def.label)
        }
        FieldValue::Decimal(d) if def.step != Step::Mileage => {
            format!("✅ {}: *{d}* L", def.label)
        }
        other => format!("✅ {}: *{other}*", def.label),
    }
}

pub fn remaining_line(remaining: Decimal) -> String {
    format!("📊 Remaining: *{remaining}* L (calculated automatically)")
}

pub fn current_value_line(value: &str) -> String {
    format!("✏️ Current value: *{value}*")
}

pub fn save_error(reason: &str) -> String {
    format!("❌ *Save error:*\n{reason}")
}

/// Full review of a draft; absent values show as "—".
pub fn summary(draft: &ReportDraft) -> String {
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "—".into());
    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "—".into())
    };
    let liters = |d: Option<Decimal>| d.map(|d| d.to_string()).unwrap_or_else(|| "—".into());
    let photo = |id: &Option<String>| if id.is_some() { "✅" } else { "—" };

    format!(
        "📋 *Report Summary*\n\n\
         👨‍✈️ *Captain:* {captain}\n\
         🚤 *Boat:* {boat}\n\
         🏝 *Program:* {program}\n\
         ⚓ *Pier:* {pier}\n\n\
         📅 *Departure:* {departure}\n\
         📅 *Return:* {ret}\n\
         📅 *Refill Date:* {refill}\n\n\
         ⚡ *Max Speed:* {speed}\n\
         ⛽ *Refuel:* {refuel}\n\
         ⛽ *Total:* {total}\n\
         ⛽ *Used:* {used}\n\
         ⛽ *Left:* {left}\n\n\
         🛣 *Mileage:* {mileage}\n\
         📷 *Odometer photo:* {odometer}\n\
         📷 *Receipt photo:* {receipt}",
        captain = text(&draft.captain),
        boat = text(&draft.boat),
        program = draft.program_display(),
        pier = text(&draft.pier),
        departure = date(draft.departure_date),
        ret = date(draft.return_date),
        refill = date(draft.refill_date),
        speed = draft
            .max_speed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "—".into()),
        refuel = liters(draft.gasoline_refuel),
        total = liters(draft.total_gasoline),
        used = liters(draft.gasoline_used),
        left = draft.gasoline_left,
        mileage = liters(draft.mileage),
        odometer = photo(&draft.mileage_photo_id),
        receipt = photo(&draft.bill_photo_id),
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;

    fn def(step: Step) -> &'static FieldDef {
        step.field().unwrap()
    }

    #[test]
    fn prompt_with_hint() {
        assert_eq!(
            step_prompt(def(Step::MaxSpeed)),
            "⚡ *Max speed:*\n\nEnter a number:"
        );
        assert_eq!(step_prompt(def(Step::Boat)), "🚤 *Select boat:*");
    }

    #[test]
    fn acknowledgements() {
        assert_eq!(
            acknowledgement(def(Step::Captain), &FieldValue::Text("Alice".into())),
            "✅ Captain: *Alice*"
        );
        assert_eq!(
            acknowledgement(def(Step::Program), &FieldValue::Text("N/A".into())),
            "✅ Program: *N/A (Private tour)*"
        );
        assert_eq!(
            acknowledgement(def(Step::GasolineRefuel), &FieldValue::Decimal(dec!(50))),
            "✅ Refueled: *50* L"
        );
        assert_eq!(
            acknowledgement(def(Step::Mileage), &FieldValue::Decimal(dec!(12.5))),
            "✅ Mileage: *12.5*"
        );
        assert_eq!(
            acknowledgement(def(Step::Mileage), &FieldValue::Skipped),
            "⏭ Mileage: *skipped*"
        );
        assert_eq!(
            acknowledgement(def(Step::MileagePhoto), &FieldValue::Photo("f".into())),
            "✅ Odometer photo: *uploaded*"
        );
        assert_eq!(
            acknowledgement(
                def(Step::DepartureDate),
                &FieldValue::Date(NaiveDate::from_ymd_opt(2026, 1, 10).unwrap())
            ),
            "✅ Departure: *10.01.2026*"
        );
    }

    #[test]
    fn summary_marks_missing_values() {
        let summary = summary(&ReportDraft::default());
        assert!(summary.starts_with("📋 *Report Summary*"));
        assert!(summary.contains("👨‍✈️ *Captain:* —"));
        assert!(summary.contains("🛣 *Mileage:* —"));
        assert!(summary.contains("📷 *Receipt photo:* —"));
    }

    #[test]
    fn summary_shows_private_route_and_photos() {
        let draft = ReportDraft {
            program: Some("N/A".into()),
            private_program: Some("Island Tour".into()),
            bill_photo_id: Some("f".into()),
            gasoline_left: dec!(120),
            ..Default::default()
        };
        let summary = summary(&draft);
        assert!(summary.contains("🏝 *Program:* N/A → Island Tour"));
        assert!(summary.contains("📷 *Receipt photo:* ✅"));
        assert!(summary.contains("⛽ *Left:* 120"));
    }
}
