//! Text renderers for the analytics screens. Pure functions over store
//! results so they can be tested without a database.

use std::fmt::Write;

use rust_decimal::Decimal;

use super::period::range_label;
use crate::report::FuelReport;
use crate::store::{DateRange, GroupStats, PeriodSummary};

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

/// Reports listed on the recent-reports screen.
pub const RECENT_LIMIT: usize = 10;

/// Minimum trips before a captain is ranked on efficiency.
pub const MIN_TRIPS_FOR_EFFICIENCY: usize = 3;

fn num(value: Decimal) -> String {
    value.normalize().to_string()
}

fn period_line(range: Option<&DateRange>) -> String {
    match range {
        Some(range) => format!("\n📅 Period: {}\n", range_label(range)),
        None => String::new(),
    }
}

/// Boats, most economical first; the top three get medals.
pub fn boats(stats: &[GroupStats], range: Option<&DateRange>) -> String {
    if stats.is_empty() {
        return "📊 *Boat Analytics*\n\nNo data for selected period.".to_string();
    }
    let mut sorted: Vec<&GroupStats> = stats.iter().collect();
    sorted.sort_by(|a, b| a.avg_fuel_used.cmp(&b.avg_fuel_used));

    let mut text = format!("🚤 *Boat Analytics*{}\n", period_line(range));
    for (i, s) in sorted.iter().enumerate() {
        let medal = MEDALS.get(i).map(|m| format!("{m} ")).unwrap_or_default();
        let _ = write!(
            text,
            "\n{medal}*{}*\n   📊 Trips: {}\n   ⛽ Avg. consumption: {}L\n   ⚡ Avg. speed: {}\n   🔋 Total consumed: {}L\n",
            s.name,
            s.trips,
            num(s.avg_fuel_used),
            num(s.avg_speed),
            num(s.total_fuel_used),
        );
    }
    text
}

/// Captains, busiest first.
pub fn captains(stats: &[GroupStats], range: Option<&DateRange>) -> String {
    if stats.is_empty() {
        return "📊 *Captain Analytics*\n\nNo data for selected period.".to_string();
    }
    let mut sorted: Vec<&GroupStats> = stats.iter().collect();
    sorted.sort_by(|a, b| b.trips.cmp(&a.trips));

    let mut text = format!("👨‍✈️ *Captain Analytics*{}\n", period_line(range));
    for (i, s) in sorted.iter().enumerate() {
        let medal = if i == 0 { "🏆 " } else { "" };
        let _ = write!(
            text,
            "\n{medal}*{}*\n   📊 Trips: {}\n   ⛽ Avg. consumption: {}L\n   ⚡ Avg. speed: {}\n   🔋 Total consumed: {}L\n   ⛽ Total refueled: {}L\n",
            s.name,
            s.trips,
            num(s.avg_fuel_used),
            num(s.avg_speed),
            num(s.total_fuel_used),
            num(s.total_refuel),
        );
    }
    text
}

/// Programs, thirstiest first.
pub fn programs(stats: &[GroupStats], range: Option<&DateRange>) -> String {
    if stats.is_empty() {
        return "📊 *Program Analytics*\n\nNo data for selected period.".to_string();
    }
    let mut sorted: Vec<&GroupStats> = stats.iter().collect();
    sorted.sort_by(|a, b| b.avg_fuel_used.cmp(&a.avg_fuel_used));

    let mut text = format!("🏝 *Consumption by Program*{}\n", period_line(range));
    for s in sorted {
        let _ = write!(
            text,
            "\n*{}*\n   📊 Trips: {}\n   ⛽ Avg. consumption: {}L\n   🔋 Total: {}L\n",
            s.name,
            s.trips,
            num(s.avg_fuel_used),
            num(s.total_fuel_used),
        );
    }
    text
}

/// Top boats by economy, top captains by trips, and top captains by
/// economy among those with enough trips.
pub fn ranking(boats: &[GroupStats], captains: &[GroupStats], range: Option<&DateRange>) -> String {
    if boats.is_empty() && captains.is_empty() {
        return "📊 *Efficiency Ranking*\n\nNo data.".to_string();
    }
    let period = match range {
        Some(range) => format!("\n📅 {}\n", range_label(range)),
        None => String::new(),
    };
    let mut text = format!("🏆 *Efficiency Ranking*{period}\n");

    if !boats.is_empty() {
        let mut sorted: Vec<&GroupStats> = boats.iter().collect();
        sorted.sort_by(|a, b| a.avg_fuel_used.cmp(&b.avg_fuel_used));
        text.push_str("\n🚤 *Most Efficient Boats:*\n");
        for (medal, b) in MEDALS.iter().zip(sorted) {
            let _ = writeln!(text, "{medal} {} — {}L/trip", b.name, num(b.avg_fuel_used));
        }
    }

    if !captains.is_empty() {
        let mut busiest: Vec<&GroupStats> = captains.iter().collect();
        busiest.sort_by(|a, b| b.trips.cmp(&a.trips));
        text.push_str("\n👨‍✈️ *Most Active Captains:*\n");
        for (medal, c) in MEDALS.iter().zip(busiest) {
            let _ = writeln!(text, "{medal} {} — {} trips", c.name, c.trips);
        }

        let mut economical: Vec<&GroupStats> = captains
            .iter()
            .filter(|c| c.trips >= MIN_TRIPS_FOR_EFFICIENCY)
            .collect();
        if !economical.is_empty() {
            economical.sort_by(|a, b| a.avg_fuel_used.cmp(&b.avg_fuel_used));
            text.push_str("\n⛽ *Most Efficient Captains:*\n");
            let _ = writeln!(text, "_(minimum {MIN_TRIPS_FOR_EFFICIENCY} trips)_");
            for (medal, c) in MEDALS.iter().zip(economical) {
                let _ = writeln!(text, "{medal} {} — {}L/trip", c.name, num(c.avg_fuel_used));
            }
        }
    }
    text
}

/// Up to [`RECENT_LIMIT`] reports, latest departure first.
pub fn recent_reports(reports: &[FuelReport], range: &DateRange) -> String {
    if reports.is_empty() {
        return "📋 *Reports*\n\nNo reports for selected period.".to_string();
    }
    let mut text = format!("📋 *Reports for Period*\n📅 {}\n\n", range_label(range));
    for r in reports.iter().take(RECENT_LIMIT) {
        let rec = &r.record;
        let _ = write!(
            text,
            "*{}* | {} | {}\n   🏝 {}\n   ⛽ Used: {}L | Refueled: {}L\n\n",
            rec.departure_date.format("%d.%m"),
            rec.captain,
            rec.boat,
            rec.program_display(),
            num(rec.gasoline_used),
            num(rec.gasoline_refuel),
        );
    }
    if reports.len() > RECENT_LIMIT {
        let _ = write!(text, "_...showing {RECENT_LIMIT} of {} reports_", reports.len());
    }
    text
}

pub fn summary(summary: &PeriodSummary, range: &DateRange) -> String {
    let period = range_label(range);
    if summary.total_trips == 0 {
        return format!("📊 *Period Summary*\n📅 {period}\n\nNo data for selected period.");
    }
    format!(
        "📊 *Period Summary*\n📅 {period}\n\n📈 *General Statistics:*\n   🚤 Total trips: {}\n   ⛽ Fuel consumed: {}L\n   🔋 Fuel refueled: {}L\n   📊 Avg. consumption per trip: {}L\n   ⚡ Avg. max speed: {}\n",
        summary.total_trips,
        num(summary.total_fuel_used),
        num(summary.total_refuel),
        num(summary.avg_fuel_per_trip),
        num(summary.avg_speed),
    )
}

/// A user's own recent reports, for the history screen.
pub fn history(reports: &[FuelReport]) -> String {
    if reports.is_empty() {
        return "📊 *Report History*\n\nYou don't have any reports yet.".to_string();
    }
    let mut text = String::from("📊 *Recent Reports:*\n\n");
    for (i, r) in reports.iter().enumerate() {
        let rec = &r.record;
        let _ = write!(
            text,
            "*{}. {}*\n   👨‍✈️ {} | 🚤 {}\n   🏝 {}\n   ⛽ Refueled: {}L\n\n",
            i + 1,
            rec.departure_date.format("%d.%m.%Y"),
            rec.captain,
            rec.boat,
            rec.program,
            num(rec.gasoline_refuel),
        );
    }
    text
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::report::ReportRecord;

    fn stats(name: &str, trips: usize, avg: Decimal) -> GroupStats {
        GroupStats {
            name: name.into(),
            trips,
            avg_fuel_used: avg,
            total_fuel_used: avg * Decimal::from(trips as u64),
            avg_speed: dec!(30),
            avg_refuel: dec!(50),
            total_refuel: dec!(50) * Decimal::from(trips as u64),
        }
    }

    fn report(id: i64, day: u32, captain: &str) -> FuelReport {
        let date = NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
        FuelReport {
            id,
            created_at: Utc::now(),
            record: ReportRecord {
                user_id: 1,
                captain: captain.into(),
                boat: "Orca".into(),
                program: "N/A".into(),
                private_program: Some("Island Tour".into()),
                pier: "Dock1".into(),
                departure_date: date,
                return_date: date,
                refill_date: date,
                max_speed: 30,
                gasoline_refuel: dec!(50.0),
                total_gasoline: dec!(200),
                gasoline_used: dec!(80),
                gasoline_left: dec!(120),
                mileage: None,
                mileage_photo_id: None,
                bill_photo_id: None,
            },
        }
    }

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        )
    }

    #[test]
    fn boats_sorted_by_consumption_with_medals() {
        let text = boats(
            &[stats("Orca", 2, dec!(90)), stats("Marlin", 1, dec!(45.2))],
            None,
        );
        let marlin = text.find("🥇 *Marlin*").unwrap();
        let orca = text.find("🥈 *Orca*").unwrap();
        assert!(marlin < orca);
        assert!(text.contains("Avg. consumption: 45.2L"));
        assert!(!text.contains("Period"));
    }

    #[test]
    fn empty_stats_say_so() {
        assert!(boats(&[], None).contains("No data for selected period."));
        assert!(captains(&[], None).contains("No data for selected period."));
        assert!(programs(&[], None).contains("No data for selected period."));
        assert!(ranking(&[], &[], None).contains("No data."));
    }

    #[test]
    fn captains_busiest_first_with_trophy() {
        let text = captains(
            &[stats("Alice", 1, dec!(80)), stats("Bob", 4, dec!(60))],
            Some(&january()),
        );
        assert!(text.contains("🏆 *Bob*"));
        assert!(text.contains("📅 Period: 01.01 — 31.01.2026"));
        assert!(text.contains("Total refueled: 200L"));
    }

    #[test]
    fn ranking_requires_minimum_trips_for_efficiency() {
        let captains_stats = [stats("Alice", 2, dec!(10)), stats("Bob", 3, dec!(60))];
        let text = ranking(&[stats("Orca", 2, dec!(90))], &captains_stats, None);
        assert!(text.contains("🥇 Orca — 90L/trip"));
        assert!(text.contains("🥇 Bob — 3 trips"));
        let efficient = text.split("Most Efficient Captains").nth(1).unwrap();
        assert!(efficient.contains("Bob — 60L/trip"));
        assert!(!efficient.contains("Alice"));
    }

    #[test]
    fn ranking_omits_efficiency_section_without_regulars() {
        let text = ranking(&[], &[stats("Alice", 1, dec!(10))], None);
        assert!(!text.contains("Most Efficient Captains"));
    }

    #[test]
    fn recent_reports_truncate() {
        let reports: Vec<_> = (1..=12).map(|d| report(d as i64, d, "Alice")).collect();
        let text = recent_reports(&reports, &january());
        assert_eq!(text.matches("| Alice |").count(), RECENT_LIMIT);
        assert!(text.contains("_...showing 10 of 12 reports_"));
        assert!(text.contains("🏝 N/A → Island Tour"));
    }

    #[test]
    fn summary_text() {
        let s = PeriodSummary {
            total_trips: 2,
            total_fuel_used: dec!(120),
            total_refuel: dec!(100),
            avg_fuel_per_trip: dec!(60),
            avg_speed: dec!(30),
        };
        let text = summary(&s, &january());
        assert!(text.contains("Total trips: 2"));
        assert!(text.contains("Avg. consumption per trip: 60L"));
        assert!(summary(&PeriodSummary::default(), &january()).contains("No data"));
    }

    #[test]
    fn history_lists_numbered_reports() {
        let text = history(&[report(1, 10, "Alice")]);
        assert!(text.starts_with("📊 *Recent Reports:*"));
        assert!(text.contains("*1. 10.01.2026*"));
        assert!(text.contains("👨‍✈️ Alice | 🚤 Orca"));
        assert!(text.contains("Refueled: 50L"));
        assert!(history(&[]).contains("You don't have any reports yet."));
    }
}
