//! Per-document file state: where the document lives and how it is encoded.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::eol::LineEnding;
use super::identity::ChangeToken;
use super::load::{BomDecider, LoadOptions, LoadResult, load_with};
use super::save::{SaveOptions, SaveResult, save};
use crate::encoding::Encoding;
use crate::error::{CodecError, CodecResult};

/// Whether a location is backed by a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    /// The file exists, or was written by us
    Real,
    /// Chosen for the document but not created yet
    Virtual,
}

/// Encoding, line ending and on-disk identity of one open document.
#[derive(Debug, Clone)]
pub struct FileState {
    location: Option<PathBuf>,
    kind: LocationKind,
    pub encoding: Encoding,
    pub line_ending: LineEnding,
    pub write_bom: bool,
    token: Option<ChangeToken>,
    read_only: bool,
}

impl Default for FileState {
    fn default() -> Self {
        Self::new()
    }
}

impl FileState {
    /// An untitled document.
    pub fn new() -> Self {
        FileState {
            location: None,
            kind: LocationKind::Virtual,
            encoding: Encoding::Utf8,
            line_ending: LineEnding::platform_default(),
            write_bom: false,
            token: None,
            read_only: false,
        }
    }

    /// A document bound to `path`. Nothing is read until [`FileState::load`].
    pub fn for_location<P: AsRef<Path>>(path: P) -> Self {
        let mut state = Self::new();
        state.set_location(path, LocationKind::Real);
        state
    }

    /// Rebind the document, as "save as" does. The old token no longer applies.
    pub fn set_location<P: AsRef<Path>>(&mut self, path: P, kind: LocationKind) {
        self.location = Some(path.as_ref().to_path_buf());
        self.kind = kind;
        self.token = None;
        self.read_only = false;
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn is_untitled(&self) -> bool {
        self.location.is_none()
    }

    pub fn change_token(&self) -> Option<&ChangeToken> {
        self.token.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Token a save must find on disk, if any.
    pub(crate) fn expected_token(&self) -> Option<&ChangeToken> {
        match self.kind {
            LocationKind::Real => self.token.as_ref(),
            LocationKind::Virtual => None,
        }
    }

    /// Load the document from its location and adopt the result.
    ///
    /// A missing file with `must_exist = false` leaves the location virtual.
    pub fn load(&mut self, options: &LoadOptions, decider: &mut dyn BomDecider) -> CodecResult<LoadResult> {
        let path = self.location.as_deref().ok_or(CodecError::MissingLocation)?;
        let result = load_with(path, options, decider)?;
        self.apply_load(&result);
        Ok(result)
    }

    /// Adopt a load result produced elsewhere, e.g. by an open flow.
    pub fn apply_load(&mut self, result: &LoadResult) {
        self.encoding = result.encoding;
        self.line_ending = result.line_ending;
        self.write_bom = result.write_bom;
        self.token = result.token.clone();
        self.read_only = result.read_only;
        self.kind = if result.token.is_some() {
            LocationKind::Real
        } else {
            LocationKind::Virtual
        };
    }

    /// Save `text` to the current location and record the new token.
    pub fn save(&mut self, text: &str, options: &SaveOptions) -> CodecResult<SaveResult> {
        let result = save(self, text, options)?;
        self.kind = LocationKind::Real;
        self.token = Some(result.token.clone());
        self.encoding = result.encoding;
        // a forced save keeps the old permissions
        self.read_only = fs::metadata(&result.path)
            .map(|metadata| metadata.permissions().readonly())
            .unwrap_or(false);
        Ok(result)
    }

    /// Whether the file was changed by someone else since we last read or wrote it.
    ///
    /// A file that disappeared counts as modified; one we never read does not.
    pub fn is_modified_on_disk(&self) -> CodecResult<bool> {
        let (Some(path), Some(expected)) = (self.location.as_deref(), self.expected_token()) else {
            return Ok(false);
        };
        let current = ChangeToken::probe(path).map_err(|source| CodecError::FileStatusFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let modified = current.as_ref() != Some(expected);
        if modified {
            debug!(path = %path.display(), "file modified on disk");
        }
        Ok(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::load::AcceptBom;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_new_is_untitled() {
        let state = FileState::new();
        assert!(state.is_untitled());
        assert_eq!(state.encoding, Encoding::Utf8);
        assert_eq!(state.line_ending, LineEnding::platform_default());
        assert!(state.change_token().is_none());
    }

    #[test]
    fn test_load_then_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, b"\xFF\xFEa\x00\r\x00\n\x00").unwrap();

        let mut state = FileState::for_location(&path);
        let loaded = state.load(&LoadOptions::default(), &mut AcceptBom).unwrap();
        assert_eq!(loaded.text, "a\n");
        assert_eq!(state.encoding, Encoding::Utf16Le);
        assert_eq!(state.line_ending, LineEnding::Dos);
        assert!(state.write_bom);
        assert_eq!(state.kind(), LocationKind::Real);

        state.save(&loaded.text, &SaveOptions::default()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"\xFF\xFEa\x00\r\x00\n\x00");
        assert!(!state.is_modified_on_disk().unwrap());
    }

    #[test]
    fn test_missing_file_stays_virtual_until_saved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("later.txt");
        let mut state = FileState::for_location(&path);
        let options = LoadOptions {
            must_exist: false,
            ..LoadOptions::default()
        };
        state.load(&options, &mut AcceptBom).unwrap();
        assert_eq!(state.kind(), LocationKind::Virtual);

        // someone else creates the file; a virtual location never conflicts
        fs::write(&path, "theirs").unwrap();
        state.save("ours", &SaveOptions::default()).unwrap();
        assert_eq!(state.kind(), LocationKind::Real);
        assert!(state.change_token().is_some());
        assert_eq!(fs::read_to_string(&path).unwrap(), "ours");
    }

    #[test]
    fn test_external_change_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("watched.txt");
        fs::write(&path, "mine").unwrap();
        let mut state = FileState::for_location(&path);
        state.load(&LoadOptions::default(), &mut AcceptBom).unwrap();

        fs::write(&path, "theirs, longer").unwrap();
        assert!(state.is_modified_on_disk().unwrap());

        let err = state.save("mine again", &SaveOptions::default()).unwrap_err();
        assert!(matches!(err, CodecError::Conflict { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "theirs, longer");
    }

    #[test]
    fn test_deleted_file_counts_as_modified_but_saves() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        fs::write(&path, "x").unwrap();
        let mut state = FileState::for_location(&path);
        state.load(&LoadOptions::default(), &mut AcceptBom).unwrap();

        fs::remove_file(&path).unwrap();
        assert!(state.is_modified_on_disk().unwrap());
        state.save("x", &SaveOptions::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_set_location_drops_token() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.txt");
        fs::write(&first, "x").unwrap();
        let mut state = FileState::for_location(&first);
        state.load(&LoadOptions::default(), &mut AcceptBom).unwrap();
        assert!(state.change_token().is_some());

        state.set_location(dir.path().join("second.txt"), LocationKind::Virtual);
        assert!(state.change_token().is_none());
        assert!(!state.is_modified_on_disk().unwrap());
    }

    #[test]
    fn test_load_untitled_fails() {
        let mut state = FileState::new();
        let err = state.load(&LoadOptions::default(), &mut AcceptBom).unwrap_err();
        assert!(matches!(err, CodecError::MissingLocation));
    }
}
