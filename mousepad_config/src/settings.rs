use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default number of remembered files
pub const DEFAULT_HISTORY_ENTRIES: usize = 100;

/// `[encoding]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    /// Charset used when nothing else decides, e.g. `"UTF-8"` or `"ISO-8859-15"`
    pub default: String,
    /// Remember the encoding of each opened file
    pub remember: bool,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            default: "UTF-8".to_string(),
            remember: true,
        }
    }
}

/// Line ending for new documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEndingSetting {
    /// Whatever the running platform uses
    #[default]
    Platform,
    Unix,
    Dos,
    Mac,
}

/// `[line_ending]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineEndingSettings {
    pub default: LineEndingSetting,
}

/// `[save]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    /// Terminate the last line when saving
    pub add_last_end_of_line: bool,
    /// Backup files before writing
    pub make_backup: bool,
    /// Appended to the file name of backups
    pub backup_suffix: String,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            add_last_end_of_line: false,
            make_backup: false,
            backup_suffix: "~".to_string(),
        }
    }
}

/// `[history]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub enabled: bool,
    /// History file; the user data directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub max_entries: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            max_entries: DEFAULT_HISTORY_ENTRIES,
        }
    }
}

impl EncodingSettings {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default.trim().is_empty() {
            return Err(ConfigError::Validation("Default encoding must not be empty".to_string()));
        }
        Ok(())
    }
}

impl SaveSettings {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.backup_suffix.is_empty() {
            return Err(ConfigError::Validation("Backup suffix must not be empty".to_string()));
        }
        if self.backup_suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "Backup suffix must not contain path separators".to_string(),
            ));
        }
        Ok(())
    }
}

impl HistorySettings {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_entries == 0 {
            return Err(ConfigError::Validation(
                "History size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
