//! Change-detection tokens.
//!
//! A [`ChangeToken`] captures what a file looked like when it was last read
//! or written. Saving compares the stored token with a fresh one to detect
//! external modification, and file watchers can correlate events through
//! [`ChangeToken::etag`].

use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Bytes hashed from the start of the file.
const HASH_SAMPLE_SIZE: usize = 8192;

/// Opaque snapshot of a file's on-disk state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeToken {
    device_id: u64,
    inode: u64,
    size: u64,
    mtime: SystemTime,
    content_hash: u64,
}

impl ChangeToken {
    /// Read the current token of the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;

        let mut sample = Vec::with_capacity(HASH_SAMPLE_SIZE);
        File::open(path)?
            .take(HASH_SAMPLE_SIZE as u64)
            .read_to_end(&mut sample)?;

        Self::from_parts(&metadata, &sample)
    }

    /// Like [`ChangeToken::from_path`], but a missing file yields `None`.
    pub fn probe<P: AsRef<Path>>(path: P) -> io::Result<Option<Self>> {
        match Self::from_path(path) {
            Ok(token) => Ok(Some(token)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Build a token from metadata and the file contents already in memory.
    /// Only the leading sample of `contents` is hashed.
    pub fn from_parts(metadata: &Metadata, contents: &[u8]) -> io::Result<Self> {
        let mtime = metadata.modified()?;
        let sample = &contents[..contents.len().min(HASH_SAMPLE_SIZE)];
        let (device_id, inode) = file_id(metadata);

        Ok(ChangeToken {
            device_id,
            inode,
            size: metadata.len(),
            mtime,
            content_hash: fnv1a(sample),
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> SystemTime {
        self.mtime
    }

    /// Whether both tokens describe the same inode, regardless of content.
    pub fn is_same_file(&self, other: &ChangeToken) -> bool {
        self.device_id == other.device_id && self.inode == other.inode
    }

    /// String form for external watchers, `seconds:nanoseconds-size-hash`.
    pub fn etag(&self) -> String {
        let since_epoch = self.mtime.duration_since(UNIX_EPOCH).unwrap_or_default();
        format!(
            "{}:{:09}-{}-{:016x}",
            since_epoch.as_secs(),
            since_epoch.subsec_nanos(),
            self.size,
            self.content_hash
        )
    }
}

#[cfg(unix)]
fn file_id(metadata: &Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (metadata.dev(), metadata.ino())
}

#[cfg(not(unix))]
fn file_id(_metadata: &Metadata) -> (u64, u64) {
    // No stable file id without platform APIs; size, mtime and hash still apply.
    (0, 0)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_token_is_stable_without_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stable.txt");
        fs::write(&path, b"Hello, world!").unwrap();

        let first = ChangeToken::from_path(&path).unwrap();
        let second = ChangeToken::from_path(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.etag(), second.etag());
        assert_eq!(first.size(), 13);
    }

    #[test]
    fn test_token_changes_with_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("changing.txt");
        fs::write(&path, b"Hello, world!").unwrap();
        let before = ChangeToken::from_path(&path).unwrap();

        fs::write(&path, b"Hello, universe!").unwrap();
        let after = ChangeToken::from_path(&path).unwrap();

        assert!(before.is_same_file(&after));
        assert_ne!(before, after);
    }

    #[test]
    fn test_same_size_rewrite_is_caught_by_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("same-size.txt");
        fs::write(&path, b"aaaa").unwrap();
        let before = ChangeToken::from_path(&path).unwrap();

        fs::write(&path, b"bbbb").unwrap();
        let after = ChangeToken::from_path(&path).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_from_parts_matches_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parts.txt");
        fs::write(&path, b"contents").unwrap();

        let metadata = fs::metadata(&path).unwrap();
        let from_parts = ChangeToken::from_parts(&metadata, b"contents").unwrap();
        assert_eq!(from_parts, ChangeToken::from_path(&path).unwrap());
    }

    #[test]
    fn test_probe_missing_file() {
        let dir = tempdir().unwrap();
        assert_eq!(ChangeToken::probe(dir.path().join("absent")).unwrap(), None);
    }
}
