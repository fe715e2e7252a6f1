//! Fuel Report Bot — turn-based fuel report collection over Telegram.

pub mod access;
pub mod analytics;
pub mod bot;
pub mod channels;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod report;
pub mod store;
