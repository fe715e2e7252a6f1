//! Reporting periods offered by the analytics screens.

use chrono::{Datelike, Duration, NaiveDate};

use crate::store::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    ThisMonth,
    ThreeMonths,
    All,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Week,
        Period::Month,
        Period::ThisMonth,
        Period::ThreeMonths,
        Period::All,
    ];

    /// Callback code, the last segment of `analytics:<kind>:<code>`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::ThisMonth => "this_month",
            Self::ThreeMonths => "3months",
            Self::All => "all",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Week => "7 days",
            Self::Month => "30 days",
            Self::ThisMonth => "This month",
            Self::ThreeMonths => "3 months",
            Self::All => "All time",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    /// The date range ending today. `None` means no restriction.
    pub fn range(&self, today: NaiveDate) -> Option<DateRange> {
        let days_back = match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::ThreeMonths => 90,
            Self::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                return Some(DateRange::new(first, today));
            }
            Self::All => return None,
        };
        let start = today
            .checked_sub_signed(Duration::days(days_back))
            .unwrap_or(NaiveDate::MIN);
        Some(DateRange::new(start, today))
    }
}

/// "01.01 — 31.01.2026"
pub fn range_label(range: &DateRange) -> String {
    format!(
        "{} — {}",
        range.start.format("%d.%m"),
        range.end.format("%d.%m.%Y")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn codes_round_trip() {
        for period in Period::ALL {
            assert_eq!(Period::parse(period.code()), Some(period));
        }
        assert_eq!(Period::parse("year"), None);
    }

    #[test]
    fn rolling_ranges() {
        let today = date(2026, 3, 15);
        assert_eq!(
            Period::Week.range(today),
            Some(DateRange::new(date(2026, 3, 8), today))
        );
        assert_eq!(
            Period::Month.range(today),
            Some(DateRange::new(date(2026, 2, 13), today))
        );
        assert_eq!(
            Period::ThreeMonths.range(today),
            Some(DateRange::new(date(2025, 12, 15), today))
        );
    }

    #[test]
    fn this_month_starts_on_the_first() {
        let today = date(2026, 3, 15);
        assert_eq!(
            Period::ThisMonth.range(today),
            Some(DateRange::new(date(2026, 3, 1), today))
        );
    }

    #[test]
    fn all_time_is_unbounded() {
        assert_eq!(Period::All.range(date(2026, 3, 15)), None);
    }

    #[test]
    fn label_format() {
        let range = DateRange::new(date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(range_label(&range), "01.01 — 31.01.2026");
    }
}
