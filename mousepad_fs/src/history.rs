//! Per-file encoding history.
//!
//! Remembers which charset, line ending and cursor offset a file was last
//! used with, so reopening it skips the guesswork. Entries are kept in MRU
//! (most recently used) order with a capacity limit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::encoding::Encoding;
use crate::file::LineEnding;

/// Default number of entries to keep
pub const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to access history file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("history file {path} is not valid")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize history")]
    Serialize(#[from] serde_json::Error),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// What is remembered about one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Charset name as written by [`Encoding::charset`]
    pub charset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_ending: Option<LineEnding>,
    /// Cursor position as a character offset
    #[serde(default)]
    pub cursor: usize,
    /// Unix epoch seconds of the last update
    #[serde(default)]
    pub used_at: u64,
}

impl HistoryEntry {
    pub fn new<P: Into<PathBuf>>(path: P, encoding: Encoding) -> Self {
        HistoryEntry {
            path: path.into(),
            charset: encoding.charset().to_string(),
            line_ending: None,
            cursor: 0,
            used_at: now_epoch_secs(),
        }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = Some(line_ending);
        self
    }

    pub fn with_cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor;
        self
    }

    /// The remembered encoding, if it still names one we can convert.
    pub fn encoding(&self) -> Option<Encoding> {
        Encoding::from_charset(&self.charset).filter(|encoding| encoding.is_supported())
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Lookup and storage of per-file history.
pub trait HistoryStore {
    fn lookup(&self, path: &Path) -> Option<HistoryEntry>;

    /// Insert or replace the entry for `entry.path`, making it the most recent.
    fn record(&mut self, entry: HistoryEntry) -> HistoryResult<()>;
}

/// Pick the encoding to load `path` with.
///
/// An explicit choice wins, then the history entry for the path, then
/// `default`. A BOM found while loading can still override the result.
pub fn resolve_encoding(
    explicit: Option<Encoding>,
    history: Option<&dyn HistoryStore>,
    path: Option<&Path>,
    default: Encoding,
) -> Encoding {
    if let Some(encoding) = explicit.filter(|encoding| *encoding != Encoding::None) {
        return encoding;
    }

    let remembered = history
        .zip(path)
        .and_then(|(history, path)| history.lookup(path))
        .and_then(|entry| entry.encoding());
    if let Some(encoding) = remembered {
        debug!(%encoding, "using encoding from history");
        return encoding;
    }

    default
}

/// Entries, most recent first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HistoryList {
    /// Schema version for forward compatibility
    #[serde(default)]
    version: u32,
    entries: Vec<HistoryEntry>,
}

impl HistoryList {
    const CURRENT_VERSION: u32 = 1;

    fn lookup(&self, path: &Path) -> Option<HistoryEntry> {
        let canonical = canonical(path);
        self.entries.iter().find(|entry| entry.path == canonical).cloned()
    }

    fn record(&mut self, mut entry: HistoryEntry, max_entries: usize) {
        entry.path = canonical(&entry.path);
        self.entries.retain(|existing| existing.path != entry.path);
        self.entries.insert(0, entry);
        self.entries.truncate(max_entries);
        self.version = Self::CURRENT_VERSION;
    }
}

/// Canonicalize path for consistent matching; missing files keep their path.
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// History that lives only as long as the process.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    list: HistoryList,
    max_entries: usize,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryHistory {
    pub fn with_capacity(max_entries: usize) -> Self {
        MemoryHistory {
            list: HistoryList::default(),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.list.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.entries.is_empty()
    }
}

impl HistoryStore for MemoryHistory {
    fn lookup(&self, path: &Path) -> Option<HistoryEntry> {
        self.list.lookup(path)
    }

    fn record(&mut self, entry: HistoryEntry) -> HistoryResult<()> {
        self.list.record(entry, self.max_entries);
        Ok(())
    }
}

/// History persisted as a JSON file, rewritten on every record.
#[derive(Debug, Clone)]
pub struct JsonHistory {
    path: PathBuf,
    list: HistoryList,
    max_entries: usize,
}

impl JsonHistory {
    /// Open the history at `path`. A missing file starts an empty history.
    pub fn open<P: Into<PathBuf>>(path: P, max_entries: usize) -> HistoryResult<Self> {
        let path = path.into();
        let list = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| HistoryError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => HistoryList::default(),
            Err(source) => return Err(HistoryError::Io { path, source }),
        };

        let mut history = JsonHistory {
            path,
            list,
            max_entries,
        };
        history.list.entries.truncate(max_entries);
        Ok(history)
    }

    /// Like [`JsonHistory::open`], but an unreadable file starts over instead of failing.
    pub fn open_or_reset<P: Into<PathBuf>>(path: P, max_entries: usize) -> Self {
        let path = path.into();
        match Self::open(path.clone(), max_entries) {
            Ok(history) => history,
            Err(err) => {
                warn!(error = %err, "discarding unreadable history");
                JsonHistory {
                    path,
                    list: HistoryList::default(),
                    max_entries,
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.list.entries
    }

    /// Write the history to disk through a temp file and rename.
    pub fn persist(&self) -> HistoryResult<()> {
        let io_error = |source: io::Error| HistoryError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = serde_json::to_string_pretty(&self.list)?;

        let temp_path = self.path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&temp_path, contents)
            .and_then(|()| fs::rename(&temp_path, &self.path))
            .map_err(|err| {
                let _ = fs::remove_file(&temp_path);
                io_error(err)
            })
    }
}

impl HistoryStore for JsonHistory {
    fn lookup(&self, path: &Path) -> Option<HistoryEntry> {
        self.list.lookup(path)
    }

    fn record(&mut self, entry: HistoryEntry) -> HistoryResult<()> {
        self.list.record(entry, self.max_entries);
        self.persist()
    }
}
