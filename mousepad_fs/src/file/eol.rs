//! End-of-line detection and normalization utilities.
//!
//! The in-memory text is always `\n`-terminated; the original style is kept
//! as a [`LineEnding`] and restored on save.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Line terminator style of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Line Feed - \n
    Unix,
    /// Carriage Return + Line Feed - \r\n
    Dos,
    /// Carriage Return (classic Mac OS) - \r
    Mac,
}

impl LineEnding {
    /// Line ending used for new documents on this platform.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            LineEnding::Dos
        } else {
            LineEnding::Unix
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Dos => "\r\n",
            LineEnding::Mac => "\r",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LineEnding::Unix => "unix",
            LineEnding::Dos => "dos",
            LineEnding::Mac => "mac",
        }
    }
}

impl Default for LineEnding {
    fn default() -> Self {
        LineEnding::platform_default()
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LineEnding::Unix => "Unix (LF)",
            LineEnding::Dos => "DOS / Windows (CR LF)",
            LineEnding::Mac => "Mac classic (CR)",
        };
        f.write_str(label)
    }
}

/// Error returned when parsing an unknown line ending name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown line ending {0:?} (expected unix, dos or mac)")]
pub struct ParseLineEndingError(pub String);

impl FromStr for LineEnding {
    type Err = ParseLineEndingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unix" | "lf" => Ok(LineEnding::Unix),
            "dos" | "windows" | "crlf" => Ok(LineEnding::Dos),
            "mac" | "cr" => Ok(LineEnding::Mac),
            _ => Err(ParseLineEndingError(s.to_string())),
        }
    }
}

/// Find the style of the first line terminator in `text`, if there is one.
pub fn find_line_ending(text: &str) -> Option<LineEnding> {
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\n' => return Some(LineEnding::Unix),
            '\r' => {
                return Some(if chars.next() == Some('\n') {
                    LineEnding::Dos
                } else {
                    LineEnding::Mac
                });
            }
            _ => {}
        }
    }
    None
}

/// Line ending of `text` judged by its first terminator, or the platform
/// default when it has none.
pub fn detect_line_ending(text: &str) -> LineEnding {
    find_line_ending(text).unwrap_or_else(LineEnding::platform_default)
}

/// Rewrite every `\r\n` and lone `\r` to `\n`.
pub fn normalize_on_load(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            chars.next_if_eq(&'\n');
            result.push('\n');
        } else {
            result.push(c);
        }
    }
    Cow::Owned(result)
}

/// Restore `line_ending` in `\n`-normalized text.
///
/// With `ensure_trailing`, a non-empty text that does not already end with
/// the terminator gets one appended.
pub fn denormalize_on_save(text: &str, line_ending: LineEnding, ensure_trailing: bool) -> Cow<'_, str> {
    let terminator = line_ending.as_str();
    let mut result = match line_ending {
        LineEnding::Unix => Cow::Borrowed(text),
        LineEnding::Dos | LineEnding::Mac => Cow::Owned(text.replace('\n', terminator)),
    };
    if ensure_trailing && !result.is_empty() && !result.ends_with(terminator) {
        result.to_mut().push_str(terminator);
    }
    result
}
