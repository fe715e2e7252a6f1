//! Option lists for the selection steps, loaded from YAML.
//!
//! ```yaml
//! captains: [Alice, Bob]
//! boats: [Orca, Marlin]
//! programs: [Snorkel, Sunset, "N/A"]
//! piers: [Dock1, Dock2]
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::DictionaryError;
use crate::report::input::SKIP_VALUE;
use crate::report::{FIELDS, InputKind, PRIVATE_TOUR_SENTINEL};

/// Telegram rejects callback data longer than this many bytes.
pub const MAX_CALLBACK_BYTES: usize = 64;

/// Which list a selection step draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionList {
    Captains,
    Boats,
    Programs,
    /// Programs without the private-tour sentinel.
    PrivatePrograms,
    Piers,
}

impl OptionList {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Captains => "captains",
            Self::Boats => "boats",
            Self::Programs => "programs",
            Self::PrivatePrograms => "private programs",
            Self::Piers => "piers",
        }
    }
}

/// Supplies the current options for a list. Consulted both when rendering
/// a step and when validating a selection.
#[async_trait]
pub trait OptionSource: Send + Sync {
    async fn options(&self, list: OptionList) -> Result<Vec<String>, DictionaryError>;
}

/// The raw lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Dictionaries {
    #[serde(default)]
    pub captains: Vec<String>,
    #[serde(default)]
    pub boats: Vec<String>,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub piers: Vec<String>,
}

impl Dictionaries {
    /// Parse the lists, dropping options that cannot be offered as buttons.
    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, DictionaryError> {
        let mut dictionaries: Self =
            serde_yaml::from_str(yaml).map_err(|e| DictionaryError::Parse {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        dictionaries.drop_unselectable();
        Ok(dictionaries)
    }

    fn drop_unselectable(&mut self) {
        retain_selectable(&mut self.captains, &[OptionList::Captains]);
        retain_selectable(&mut self.boats, &[OptionList::Boats]);
        retain_selectable(
            &mut self.programs,
            &[OptionList::Programs, OptionList::PrivatePrograms],
        );
        retain_selectable(&mut self.piers, &[OptionList::Piers]);
    }

    pub fn list(&self, list: OptionList) -> Vec<String> {
        match list {
            OptionList::Captains => self.captains.clone(),
            OptionList::Boats => self.boats.clone(),
            OptionList::Programs => self.programs.clone(),
            OptionList::PrivatePrograms => self
                .programs
                .iter()
                .filter(|p| p.as_str() != PRIVATE_TOUR_SENTINEL)
                .cloned()
                .collect(),
            OptionList::Piers => self.piers.clone(),
        }
    }
}

/// Longest `prefix:` that buttons for these lists carry.
fn button_prefix_len(lists: &[OptionList]) -> usize {
    FIELDS
        .iter()
        .filter_map(|f| match f.kind {
            InputKind::Choice(list) if lists.contains(&list) => Some(f.prefix.len() + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// An option named like the skip button would decode as a skip, and an
/// over-long one makes the whole prompt fail to send.
fn retain_selectable(items: &mut Vec<String>, lists: &[OptionList]) {
    let budget = MAX_CALLBACK_BYTES.saturating_sub(button_prefix_len(lists));
    items.retain(|item| {
        let keep = item != SKIP_VALUE && item.len() <= budget;
        if !keep {
            tracing::warn!(
                list = lists.first().map_or("", OptionList::as_str),
                option = %item,
                max_bytes = budget,
                "Dropping option that cannot be used as a button"
            );
        }
        keep
    });
}

#[async_trait]
impl OptionSource for Dictionaries {
    async fn options(&self, list: OptionList) -> Result<Vec<String>, DictionaryError> {
        let items = self.list(list);
        if items.is_empty() {
            return Err(DictionaryError::EmptyList(list.as_str().to_string()));
        }
        Ok(items)
    }
}

/// Dictionaries backed by a YAML file, reloadable at runtime.
pub struct YamlDictionary {
    path: PathBuf,
    current: RwLock<Dictionaries>,
}

impl YamlDictionary {
    pub async fn load(path: &Path) -> Result<Self, DictionaryError> {
        let dictionaries = read_file(path).await?;
        tracing::info!(
            path = %path.display(),
            captains = dictionaries.captains.len(),
            boats = dictionaries.boats.len(),
            programs = dictionaries.programs.len(),
            piers = dictionaries.piers.len(),
            "Dictionaries loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            current: RwLock::new(dictionaries),
        })
    }

    /// Re-read the file. The old lists stay in place if the read fails.
    pub async fn reload(&self) -> Result<(), DictionaryError> {
        let fresh = read_file(&self.path).await?;
        *self.current.write().await = fresh;
        tracing::info!(path = %self.path.display(), "Dictionaries reloaded");
        Ok(())
    }

    pub async fn snapshot(&self) -> Dictionaries {
        self.current.read().await.clone()
    }
}

#[async_trait]
impl OptionSource for YamlDictionary {
    async fn options(&self, list: OptionList) -> Result<Vec<String>, DictionaryError> {
        self.current.read().await.options(list).await
    }
}

async fn read_file(path: &Path) -> Result<Dictionaries, DictionaryError> {
    if !path.exists() {
        return Err(DictionaryError::NotFound(path.display().to_string()));
    }
    let raw = tokio::fs::read_to_string(path).await?;
    Dictionaries::from_yaml_str(&raw, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
captains: [Alice, Bob]
boats: [Orca]
programs: [Snorkel, "N/A", Sunset]
piers: [Dock1, Dock2, Dock3]
"#;

    #[test]
    fn parses_yaml_lists() {
        let d = Dictionaries::from_yaml_str(SAMPLE, "inline").unwrap();
        assert_eq!(d.captains, vec!["Alice", "Bob"]);
        assert_eq!(d.piers.len(), 3);
    }

    #[test]
    fn private_programs_exclude_sentinel() {
        let d = Dictionaries::from_yaml_str(SAMPLE, "inline").unwrap();
        assert_eq!(d.list(OptionList::PrivatePrograms), vec!["Snorkel", "Sunset"]);
        assert!(d.list(OptionList::Programs).contains(&"N/A".to_string()));
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let d = Dictionaries::from_yaml_str("captains: [Alice]", "inline").unwrap();
        assert!(d.boats.is_empty());
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = Dictionaries::from_yaml_str("captains: [Alice", "inline").unwrap_err();
        assert!(matches!(err, DictionaryError::Parse { .. }));
    }

    #[test]
    fn unselectable_options_are_dropped() {
        let long_pier = "P".repeat(59);
        let long_program = "S".repeat(48);
        let yaml = format!(
            "captains: [Alice, skip]\npiers: [Dock1, {long_pier}]\nprograms: [Snorkel, {long_program}]\n"
        );
        let d = Dictionaries::from_yaml_str(&yaml, "inline").unwrap();
        assert_eq!(d.captains, vec!["Alice"]);
        assert_eq!(d.piers, vec!["Dock1"]);
        assert_eq!(d.programs, vec!["Snorkel"]);
    }

    #[test]
    fn options_at_the_limit_are_kept() {
        let pier = "P".repeat(MAX_CALLBACK_BYTES - "pier:".len());
        let program = "S".repeat(MAX_CALLBACK_BYTES - "private_program:".len());
        let yaml = format!("piers: [{pier}]\nprograms: [{program}]\n");
        let d = Dictionaries::from_yaml_str(&yaml, "inline").unwrap();
        assert_eq!(d.piers, vec![pier]);
        assert_eq!(d.programs, vec![program]);
    }

    #[tokio::test]
    async fn empty_list_is_an_error() {
        let d = Dictionaries::from_yaml_str("captains: []", "inline").unwrap();
        let err = d.options(OptionList::Captains).await.unwrap_err();
        assert!(matches!(err, DictionaryError::EmptyList(ref l) if l == "captains"));
    }

    #[tokio::test]
    async fn yaml_file_load_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.yaml");
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let dict = YamlDictionary::load(&path).await.unwrap();
        assert_eq!(dict.options(OptionList::Boats).await.unwrap(), vec!["Orca"]);

        tokio::fs::write(&path, "boats: [Orca, Marlin]").await.unwrap();
        dict.reload().await.unwrap();
        assert_eq!(
            dict.options(OptionList::Boats).await.unwrap(),
            vec!["Orca", "Marlin"]
        );
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.yaml");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let dict = YamlDictionary::load(&path).await.unwrap();

        tokio::fs::write(&path, "boats: [").await.unwrap();
        assert!(dict.reload().await.is_err());
        assert_eq!(dict.snapshot().await.boats, vec!["Orca"]);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = YamlDictionary::load(Path::new("/nonexistent/dict.yaml"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DictionaryError::NotFound(_)));
    }
}
