//! Configuration discovery.
//!
//! Config lives under `$XDG_CONFIG_HOME/mousepad/` (or the platform
//! equivalent); persistent state such as the encoding history lives under
//! the user data directory.

use std::path::PathBuf;

use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};

const APP_DIR: &str = "mousepad";
const CONFIG_FILE: &str = "codec.toml";
const HISTORY_FILE: &str = "encoding-history.json";

/// `~/.config/mousepad`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// `~/.config/mousepad/codec.toml`
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// `~/.local/share/mousepad`
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR))
}

/// `~/.local/share/mousepad/encoding-history.json`
pub fn history_file() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(HISTORY_FILE))
}

/// Finds and loads the configuration file
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Explicitly requested file; must exist
    explicit: Option<PathBuf>,
    /// Searched in order; missing files are skipped
    paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader with default paths
    pub fn new() -> Self {
        Self::with_paths(config_file().into_iter().collect())
    }

    /// Create a new configuration loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { explicit: None, paths }
    }

    /// Use `path` instead of searching. Loading fails if it does not exist.
    pub fn with_explicit<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Get all configuration paths
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Load and validate the configuration.
    ///
    /// Returns the file it came from, or `None` when defaults were used.
    pub fn load(&self) -> ConfigResult<(Config, Option<PathBuf>)> {
        let source = match &self.explicit {
            Some(path) => Some(path.clone()),
            None => self.paths.iter().find(|path| path.is_file()).cloned(),
        };

        let config = match &source {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                Config::from_file(path)?
            }
            None => {
                debug!("no configuration file found, using defaults");
                Config::default()
            }
        };
        config.validate()?;
        Ok((config, source))
    }

    /// Write the default configuration to the first search path.
    pub fn create_default(&self) -> ConfigResult<PathBuf> {
        let path = self
            .explicit
            .as_ref()
            .or_else(|| self.paths.first())
            .ok_or_else(|| ConfigError::Path("No configuration paths available".to_string()))?;
        Config::default().save_to_file(path)?;
        Ok(path.clone())
    }
}

/// Where the encoding history is kept for `config`.
pub fn resolve_history_path(config: &Config) -> Option<PathBuf> {
    config.history.path.clone().or_else(history_file)
}
