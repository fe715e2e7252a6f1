//! Channel abstraction for bot I/O.

pub mod channel;
pub mod cli;
pub mod telegram;

pub use channel::*;
pub use cli::CliChannel;
pub use telegram::TelegramChannel;
