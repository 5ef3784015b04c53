//! Atomic file saving with transcoding and permission preservation.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::eol::{LineEnding, denormalize_on_save};
use super::identity::ChangeToken;
use super::state::FileState;
use crate::bom::{bom_encoding, write_bom};
use crate::encoding::{Encoding, encode};
use crate::error::{CodecError, CodecResult};

/// Buffer size for streaming writes
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for file saving operations
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Skip the external-modification check
    pub forced: bool,
    /// Copy the existing file aside before replacing it
    pub backup: bool,
    /// Appended to the file name to form the backup name
    pub backup_suffix: String,
    /// Terminate the last line if it is not already
    pub ensure_trailing_newline: bool,
    /// Whether to preserve file permissions (Unix only)
    pub preserve_permissions: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            forced: false,
            backup: false,
            backup_suffix: "~".to_string(),
            ensure_trailing_newline: false,
            preserve_permissions: true,
        }
    }
}

/// Result of a file saving operation
#[derive(Debug, Clone)]
pub struct SaveResult {
    /// Final path where file was saved, after resolving symlinks
    pub path: PathBuf,
    /// Number of bytes written, BOM included
    pub bytes_written: u64,
    /// Token of the freshly written file
    pub token: ChangeToken,
    /// Where the previous contents were copied, if a backup was made
    pub backup_path: Option<PathBuf>,
    /// Encoding the body was written in
    pub encoding: Encoding,
}

/// Bytes ready to be written, with the encoding actually used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub bytes: Vec<u8>,
    pub encoding: Encoding,
}

/// Turn `\n`-normalized text into file bytes.
///
/// A BOM request for UTF-7 writes a UTF-8 BOM and a UTF-8 body.
pub fn encode_document(
    text: &str,
    encoding: Encoding,
    line_ending: LineEnding,
    with_bom: bool,
    ensure_trailing_newline: bool,
) -> CodecResult<EncodedDocument> {
    let text = denormalize_on_save(text, line_ending, ensure_trailing_newline);

    let (bom, encoding) = match write_bom(encoding) {
        Some(bom) if with_bom => (bom, bom_encoding(encoding)),
        _ => (&[][..], encoding),
    };

    let body = encode(&text, encoding)?;
    let mut bytes = Vec::with_capacity(bom.len() + body.len());
    bytes.extend_from_slice(bom);
    bytes.extend_from_slice(&body);

    Ok(EncodedDocument { bytes, encoding })
}

/// Save `text` to the location of `state`.
///
/// This function:
/// 1. Restores the line ending, transcodes and prepends the BOM
/// 2. Refuses to overwrite a file changed since it was loaded, or a read-only
///    file, unless forced
/// 3. Makes a backup copy if requested
/// 4. Writes a temp file, copies permissions and renames it over the target
///
/// `state` is not modified; [`FileState::save`] applies the result.
pub fn save(state: &FileState, text: &str, options: &SaveOptions) -> CodecResult<SaveResult> {
    let path = state.location().ok_or(CodecError::MissingLocation)?;

    let document = encode_document(
        text,
        state.encoding,
        state.line_ending,
        state.write_bom,
        options.ensure_trailing_newline,
    )?;

    if !options.forced {
        check_unchanged(path, state.expected_token())?;
    }

    let target = resolve_target(path).map_err(|source| CodecError::WritingFailed {
        path: path.to_path_buf(),
        source,
    })?;
    if !options.forced {
        check_writable(&target)?;
    }

    let backup_path = if options.backup {
        make_backup(&target, &options.backup_suffix)?
    } else {
        None
    };

    let bytes_written = replace_atomically(&target, &document.bytes, options)?;

    let token = fs::metadata(&target)
        .and_then(|metadata| ChangeToken::from_parts(&metadata, &document.bytes))
        .map_err(|source| CodecError::FileStatusFailed {
            path: target.clone(),
            source,
        })?;

    info!(
        path = %target.display(),
        encoding = %document.encoding,
        bytes = bytes_written,
        "saved file"
    );

    Ok(SaveResult {
        path: target,
        bytes_written,
        token,
        backup_path,
        encoding: document.encoding,
    })
}

/// Fail with `Conflict` when the file on disk no longer matches `expected`.
///
/// Without an expected token, or when the file is gone, there is nothing to
/// conflict with.
fn check_unchanged(path: &Path, expected: Option<&ChangeToken>) -> CodecResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let current = ChangeToken::probe(path).map_err(|source| CodecError::FileStatusFailed {
        path: path.to_path_buf(),
        source,
    })?;

    match current {
        Some(current) if current != *expected => {
            debug!(path = %path.display(), "file changed on disk since it was loaded");
            Err(CodecError::Conflict {
                path: path.to_path_buf(),
            })
        }
        _ => Ok(()),
    }
}

/// The rename only needs a writable directory, so a read-only target has to
/// be refused explicitly.
fn check_writable(target: &Path) -> CodecResult<()> {
    match fs::metadata(target) {
        Ok(metadata) if metadata.permissions().readonly() => {
            debug!(path = %target.display(), "refusing to replace read-only file");
            Err(CodecError::WritingFailed {
                path: target.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "file is read-only"),
            })
        }
        _ => Ok(()),
    }
}

/// Follow a symlink so the rename replaces its target instead of the link.
fn resolve_target(path: &Path) -> io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => match fs::canonicalize(path) {
            Ok(resolved) => Ok(resolved),
            // dangling link: write where it points
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let link = fs::read_link(path)?;
                Ok(match path.parent() {
                    Some(parent) if link.is_relative() => parent.join(link),
                    _ => link,
                })
            }
            Err(err) => Err(err),
        },
        Ok(_) => Ok(path.to_path_buf()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(err),
    }
}

fn make_backup(target: &Path, suffix: &str) -> CodecResult<Option<PathBuf>> {
    if !target.exists() {
        return Ok(None);
    }

    let backup_path = sibling_path(target, "", suffix);
    fs::copy(target, &backup_path).map_err(|source| CodecError::WritingFailed {
        path: backup_path.clone(),
        source,
    })?;

    info!(backup = %backup_path.display(), "backup written");
    Ok(Some(backup_path))
}

/// Write to a hidden temp sibling, then rename it over `target`.
fn replace_atomically(target: &Path, content: &[u8], options: &SaveOptions) -> CodecResult<u64> {
    let temp_path = sibling_path(target, ".", &format!(".{}.tmp", std::process::id()));
    let writing_failed = |source: io::Error| CodecError::WritingFailed {
        path: target.to_path_buf(),
        source,
    };

    let result = write_to_file(&temp_path, content)
        .and_then(|bytes_written| {
            if options.preserve_permissions && target.exists() {
                preserve_permissions(target, &temp_path)?;
            }
            Ok(bytes_written)
        })
        .and_then(|bytes_written| {
            fs::rename(&temp_path, target)?;
            Ok(bytes_written)
        });

    if result.is_err() {
        // the temp file may or may not exist at this point
        let _ = fs::remove_file(&temp_path);
    }
    result.map_err(writing_failed)
}

/// Write content to a file with buffering.
fn write_to_file(path: &Path, content: &[u8]) -> io::Result<u64> {
    let file = File::create(path)?;
    let mut writer = io::BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    writer.write_all(content)?;

    // Ensure all data is flushed to disk
    writer.flush()?;
    writer.get_ref().sync_all()?;

    Ok(content.len() as u64)
}

/// `<prefix><file name><suffix>` next to `path`.
fn sibling_path(path: &Path, prefix: &str, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!("{prefix}{name}{suffix}"))
}

/// Preserve file permissions from source to target.
#[cfg(unix)]
fn preserve_permissions(source: &Path, target: &Path) -> io::Result<()> {
    let permissions = fs::metadata(source)?.permissions();
    fs::set_permissions(target, permissions)
}

#[cfg(not(unix))]
fn preserve_permissions(_source: &Path, _target: &Path) -> io::Result<()> {
    // ACLs are left to the platform
    Ok(())
}
