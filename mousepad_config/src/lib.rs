//! # mousepad_config - Codec settings for the mousepad editor
//!
//! Settings live in a TOML file (`codec.toml` under the user config
//! directory) with one table per concern:
//!
//! ```toml
//! [encoding]
//! default = "UTF-8"
//! remember = true
//!
//! [line_ending]
//! default = "platform"
//!
//! [save]
//! add_last_end_of_line = false
//! make_backup = false
//! backup_suffix = "~"
//!
//! [history]
//! enabled = true
//! max_entries = 100
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod settings;

pub use config::Config;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, config_dir, config_file, data_dir, history_file, resolve_history_path};
pub use settings::{EncodingSettings, HistorySettings, LineEndingSetting, LineEndingSettings, SaveSettings};
