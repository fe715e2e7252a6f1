//! Decoding raw events into step input, and the value parsers.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::channels::EventKind;

/// Button value that skips an optional step.
pub const SKIP_VALUE: &str = "skip";

/// What the user did, decoded once at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    Back,
    Cancel,
    /// A button with a `prefix:value` token.
    Selection { prefix: String, value: String },
    /// A `prefix:skip` button.
    Skip { prefix: String },
    Text(String),
    Photo { file_id: String },
}

impl StepInput {
    pub fn decode(kind: &EventKind) -> Self {
        match kind {
            EventKind::Text(text) => Self::from_text(text),
            EventKind::Photo { file_id } => Self::Photo {
                file_id: file_id.clone(),
            },
            EventKind::Callback { data, .. } => Self::from_token(data),
        }
    }

    pub fn from_text(text: &str) -> Self {
        match text.trim() {
            "/cancel" => Self::Cancel,
            _ => Self::Text(text.to_string()),
        }
    }

    /// Decode a button token. The token is split on the first `:` only,
    /// so values may themselves contain colons.
    pub fn from_token(token: &str) -> Self {
        match token {
            "back" => Self::Back,
            "cancel" => Self::Cancel,
            _ => match token.split_once(':') {
                Some((prefix, SKIP_VALUE)) => Self::Skip {
                    prefix: prefix.to_string(),
                },
                Some((prefix, value)) => Self::Selection {
                    prefix: prefix.to_string(),
                    value: value.to_string(),
                },
                None => Self::Selection {
                    prefix: token.to_string(),
                    value: String::new(),
                },
            },
        }
    }
}

/// Parse a typed date: DD.MM.YYYY, with DD/MM/YYYY and YYYY-MM-DD accepted too.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    ["%d.%m.%Y", "%d/%m/%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parse a calendar button's ISO date.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn parse_integer(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Parse a non-negative quantity. A comma is accepted as decimal separator.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    let value = Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()?;
    (!value.is_sign_negative() || value.is_zero()).then_some(value)
}
