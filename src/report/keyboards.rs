//! Keyboard builders for the report flow and the main menu.

use chrono::{Duration, NaiveDate};

use super::input::SKIP_VALUE;
use crate::channels::{Button, Keyboard};

pub const MENU_NEW_REPORT: &str = "📝 New Report";
pub const MENU_ANALYTICS: &str = "📊 Analytics";
pub const MENU_HISTORY: &str = "📋 History";
pub const MENU_HELP: &str = "ℹ️ Help";

/// Calendar buttons span this many days either side of today.
const CALENDAR_SPAN_DAYS: i64 = 5;

fn navigation_row() -> Vec<Button> {
    vec![
        Button::new("⬅️ Back", "back"),
        Button::new("❌ Cancel", "cancel"),
    ]
}

/// Only Back and Cancel, for free-text steps.
pub fn navigation_keyboard() -> Keyboard {
    Keyboard::Inline(vec![navigation_row()])
}

/// One button per option, `columns` per row, tokens `prefix:option`.
pub fn selection_keyboard(options: &[String], prefix: &str, columns: usize) -> Keyboard {
    let columns = columns.max(1);
    let mut rows: Vec<Vec<Button>> = options
        .chunks(columns)
        .map(|chunk| {
            chunk
                .iter()
                .map(|o| Button::new(o.clone(), format!("{prefix}:{o}")))
                .collect()
        })
        .collect();
    rows.push(navigation_row());
    Keyboard::Inline(rows)
}

/// Calendar of the days around `today`, three per row. Tokens carry the
/// ISO date: `prefix:YYYY-MM-DD`.
pub fn date_keyboard(prefix: &str, today: NaiveDate) -> Keyboard {
    let days: Vec<Button> = (-CALENDAR_SPAN_DAYS..=CALENDAR_SPAN_DAYS)
        .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
        .map(|day| {
            let label = if day == today {
                format!("📅 {}", day.format("%d.%m"))
            } else {
                day.format("%d.%m").to_string()
            };
            Button::new(label, format!("{prefix}:{}", day.format("%Y-%m-%d")))
        })
        .collect();

    let mut rows: Vec<Vec<Button>> = days.chunks(3).map(<[Button]>::to_vec).collect();
    rows.push(navigation_row());
    Keyboard::Inline(rows)
}

/// Skip button for an optional number.
pub fn skip_keyboard(prefix: &str) -> Keyboard {
    Keyboard::Inline(vec![
        vec![Button::new("⏭ Skip", format!("{prefix}:{SKIP_VALUE}"))],
        navigation_row(),
    ])
}

/// Skip button for an optional photo.
pub fn photo_keyboard(prefix: &str) -> Keyboard {
    Keyboard::Inline(vec![
        vec![Button::new("⏭ No photo", format!("{prefix}:{SKIP_VALUE}"))],
        navigation_row(),
    ])
}

pub fn confirm_keyboard() -> Keyboard {
    Keyboard::Inline(vec![
        vec![
            Button::new("✅ Submit", "confirm:yes"),
            Button::new("❌ Cancel", "confirm:no"),
        ],
        vec![Button::new("✏️ Edit", "confirm:edit")],
        navigation_row(),
    ])
}

/// Persistent menu shown outside the flow.
pub fn main_menu_keyboard() -> Keyboard {
    Keyboard::Menu(vec![
        vec![MENU_NEW_REPORT.to_string()],
        vec![MENU_ANALYTICS.to_string(), MENU_HISTORY.to_string()],
        vec![MENU_HELP.to_string()],
    ])
}
