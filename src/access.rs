//! Allow-list of Telegram users permitted to use the bot.
//!
//! ```yaml
//! allow_everyone: false
//! users:
//!   - telegram_id: 123456789
//!     name: Alice
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllowedUser {
    pub telegram_id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AllowListFile {
    #[serde(default)]
    allow_everyone: bool,
    #[serde(default)]
    users: Vec<AllowedUser>,
}

/// Who may talk to the bot.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    allow_everyone: bool,
    users: HashMap<i64, AllowedUser>,
}

impl AllowList {
    pub fn from_users(users: impl IntoIterator<Item = AllowedUser>) -> Self {
        Self {
            allow_everyone: false,
            users: users.into_iter().map(|u| (u.telegram_id, u)).collect(),
        }
    }

    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: AllowListFile = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

        let mut users = HashMap::new();
        for user in file.users {
            if user.telegram_id == 0 {
                tracing::warn!(
                    name = %user.name,
                    "Ignoring allow-list entry with telegram_id 0; use allow_everyone instead"
                );
                continue;
            }
            users.insert(user.telegram_id, user);
        }

        Ok(Self {
            allow_everyone: file.allow_everyone,
            users,
        })
    }

    /// Load from a YAML file. A missing file yields an empty list that
    /// admits nobody.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Allow-list file not found; all users will be denied");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let list = Self::from_yaml_str(&raw, &path.display().to_string())?;
        tracing::info!(
            users = list.users.len(),
            allow_everyone = list.allow_everyone,
            "Allow-list loaded"
        );
        Ok(list)
    }

    pub fn is_allowed(&self, telegram_id: i64) -> bool {
        self.allow_everyone || self.users.contains_key(&telegram_id)
    }

    pub fn allows_everyone(&self) -> bool {
        self.allow_everyone
    }

    pub fn user(&self, telegram_id: i64) -> Option<&AllowedUser> {
        self.users.get(&telegram_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
