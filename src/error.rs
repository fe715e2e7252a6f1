//! Error types for the fuel report bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Aggregate failed: {0}")]
    Aggregate(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Option-list (dictionary) errors.
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("Dictionary file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse dictionary {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("No {0} configured")]
    EmptyList(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Report submission and analytics errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Not all required fields are filled: {}", .0.join(", "))]
    Validation(Vec<&'static str>),

    #[error("{0}")]
    Database(#[from] DatabaseError),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Image rendering failed: {0}")]
    Image(String),
}

/// Rejected user input at a report step. The message is shown inline above
/// the re-rendered step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("❌ Please choose one of the options below")]
    ChooseOption,

    #[error("❌ Unknown option: {0}")]
    UnknownOption(String),

    #[error("❌ Invalid date format. Use DD.MM.YYYY")]
    InvalidDate,

    #[error("❌ Enter a whole number")]
    NotAnInteger,

    #[error("❌ Enter a number")]
    NotANumber,

    #[error("❌ Enter a number or press 'Skip'")]
    NotANumberOrSkip,

    #[error("❌ Send photo or press 'No photo'")]
    PhotoExpected,
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
