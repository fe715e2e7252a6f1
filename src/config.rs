//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Which transport the bot listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    Cli,
}

/// Bot configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub channel: ChannelKind,
    /// Telegram Bot API token. Required for the Telegram channel.
    pub bot_token: Option<SecretString>,
    /// libSQL database file.
    pub db_path: PathBuf,
    /// YAML file with captains, boats, programs and piers.
    pub dictionaries_path: PathBuf,
    /// YAML file with the allowed Telegram users.
    pub allowed_users_path: PathBuf,
    /// Idle limit for in-progress report sessions. `None` keeps sessions
    /// until they are finished, cancelled, or the process exits.
    pub session_idle_timeout: Option<Duration>,
    /// User id the CLI channel reports events as.
    pub cli_user_id: i64,
    /// Directory for daily-rolling log files. Logs go to stderr when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            channel: ChannelKind::Telegram,
            bot_token: None,
            db_path: PathBuf::from("./data/fuel-reports.db"),
            dictionaries_path: PathBuf::from("config/dictionaries.yaml"),
            allowed_users_path: PathBuf::from("config/allowed_users.yaml"),
            session_idle_timeout: None,
            cli_user_id: 1,
            log_dir: None,
        }
    }
}

impl BotConfig {
    /// Build the config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let channel = match lookup("FUEL_CHANNEL").as_deref().map(str::trim) {
            None | Some("") | Some("telegram") => ChannelKind::Telegram,
            Some("cli") => ChannelKind::Cli,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "FUEL_CHANNEL".into(),
                    message: format!("expected 'telegram' or 'cli', got '{other}'"),
                });
            }
        };

        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        if channel == ChannelKind::Telegram && bot_token.is_none() {
            return Err(ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()));
        }

        let session_idle_timeout = match lookup("FUEL_SESSION_IDLE_MINUTES") {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => {
                let minutes: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "FUEL_SESSION_IDLE_MINUTES".into(),
                    message: format!("'{raw}' is not a whole number of minutes"),
                })?;
                let seconds = minutes.checked_mul(60).ok_or_else(|| ConfigError::InvalidValue {
                    key: "FUEL_SESSION_IDLE_MINUTES".into(),
                    message: format!("{minutes} minutes is too long"),
                })?;
                (seconds > 0).then(|| Duration::from_secs(seconds))
            }
        };

        let cli_user_id = match lookup("FUEL_CLI_USER_ID") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "FUEL_CLI_USER_ID".into(),
                message: format!("'{raw}' is not a user id"),
            })?,
            None => defaults.cli_user_id,
        };

        Ok(Self {
            channel,
            bot_token,
            db_path: lookup("FUEL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            dictionaries_path: lookup("FUEL_DICTIONARIES")
                .map(PathBuf::from)
                .unwrap_or(defaults.dictionaries_path),
            allowed_users_path: lookup("FUEL_ALLOWED_USERS")
                .map(PathBuf::from)
                .unwrap_or(defaults.allowed_users_path),
            session_idle_timeout,
            cli_user_id,
            log_dir: lookup("FUEL_LOG_DIR").map(PathBuf::from),
        })
    }
}
