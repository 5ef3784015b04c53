//! File loading: BOM handling, charset decoding and line-ending normalization.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use super::eol::{LineEnding, find_line_ending, normalize_on_load};
use super::identity::ChangeToken;
use crate::bom::detect_bom;
use crate::encoding::{Encoding, decode_at, decode_repairing};
use crate::error::{CodecError, CodecResult};

/// Decides whether a BOM that disagrees with the requested encoding wins.
///
/// This is the confirmation point a UI would turn into a dialog.
pub trait BomDecider {
    /// Return `true` to load with `bom` instead of `requested`.
    fn honour_bom(&mut self, requested: Encoding, bom: Encoding) -> bool;
}

/// Always lets the BOM win.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptBom;

impl BomDecider for AcceptBom {
    fn honour_bom(&mut self, _requested: Encoding, _bom: Encoding) -> bool {
        true
    }
}

impl<F> BomDecider for F
where
    F: FnMut(Encoding, Encoding) -> bool,
{
    fn honour_bom(&mut self, requested: Encoding, bom: Encoding) -> bool {
        self(requested, bom)
    }
}

/// Configuration for file loading operations
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Encoding resolved by the caller
    pub encoding: Encoding,
    /// Fail when the file does not exist instead of returning empty text
    pub must_exist: bool,
    /// Skip BOM detection entirely
    pub ignore_bom: bool,
    /// Replace invalid UTF-8 instead of failing with `EncodingNotValid`
    pub make_valid: bool,
    /// Line ending assumed when the text has no terminator
    pub line_ending: LineEnding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            encoding: Encoding::Utf8,
            must_exist: true,
            ignore_bom: false,
            make_valid: false,
            line_ending: LineEnding::platform_default(),
        }
    }
}

impl LoadOptions {
    pub fn with_encoding(encoding: Encoding) -> Self {
        LoadOptions {
            encoding,
            ..LoadOptions::default()
        }
    }
}

/// Result of a file loading operation
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Decoded text, always `\n`-terminated
    pub text: String,
    /// Encoding the text was decoded from
    pub encoding: Encoding,
    /// Line ending found in the file
    pub line_ending: LineEnding,
    /// Number of BOM bytes consumed (0 when none was honoured)
    pub bom_length: usize,
    /// Whether the document should be saved with a BOM
    pub write_bom: bool,
    /// File offset where the first repaired sequence began
    pub first_invalid: Option<usize>,
    /// On-disk state when loaded; `None` when the file did not exist
    pub token: Option<ChangeToken>,
    pub read_only: bool,
}

impl LoadResult {
    fn empty(options: &LoadOptions) -> Self {
        LoadResult {
            text: String::new(),
            encoding: options.encoding,
            line_ending: options.line_ending,
            bom_length: 0,
            write_bom: false,
            first_invalid: None,
            token: None,
            read_only: false,
        }
    }
}

/// Load a file, letting any BOM override the requested encoding.
pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> CodecResult<LoadResult> {
    load_with(path, options, &mut AcceptBom)
}

/// Load a file, consulting `decider` when a BOM disagrees with the requested encoding.
///
/// This function:
/// 1. Reads the whole file
/// 2. Detects and strips an honoured BOM
/// 3. Decodes, repairing invalid UTF-8 if asked to
/// 4. Detects the line ending and normalizes to `\n`
/// 5. Captures the change token and read-only flag
pub fn load_with<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
    decider: &mut dyn BomDecider,
) -> CodecResult<LoadResult> {
    let path = path.as_ref();

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !options.must_exist => {
            debug!(path = %path.display(), "file does not exist yet, starting empty");
            return Ok(LoadResult::empty(options));
        }
        Err(source) => {
            return Err(CodecError::ReadingFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut result = decode_document(&bytes, options, decider)?;

    let status = fs::metadata(path).and_then(|metadata| {
        let token = ChangeToken::from_parts(&metadata, &bytes)?;
        Ok((token, metadata.permissions().readonly()))
    });
    let (token, read_only) = status.map_err(|source| CodecError::FileStatusFailed {
        path: path.to_path_buf(),
        source,
    })?;
    result.token = Some(token);
    result.read_only = read_only;

    debug!(
        path = %path.display(),
        encoding = %result.encoding,
        line_ending = result.line_ending.name(),
        bom = result.bom_length,
        "loaded file"
    );
    Ok(result)
}

/// Run the load pipeline on bytes already in memory.
///
/// The returned result has no token and is not read-only.
pub fn decode_document(
    bytes: &[u8],
    options: &LoadOptions,
    decider: &mut dyn BomDecider,
) -> CodecResult<LoadResult> {
    let mut encoding = options.encoding;
    let mut bom_length = 0;

    if !options.ignore_bom {
        let bom = detect_bom(bytes);
        if bom.is_present() {
            if bom.encoding == encoding || decider.honour_bom(encoding, bom.encoding) {
                encoding = bom.encoding;
                bom_length = bom.bom_length;
            } else {
                debug!(requested = %encoding, bom = %bom.encoding, "BOM rejected, keeping requested encoding");
            }
        }
    }
    let write_bom = bom_length > 0;

    // The last UTF-7 BOM digit can carry bits of the next character, so the
    // BOM is decoded with the body and the resulting U+FEFF dropped.
    let (payload, payload_offset) = if encoding == Encoding::Utf7 {
        (bytes, 0)
    } else {
        (&bytes[bom_length..], bom_length)
    };

    let (mut text, first_invalid) = match decode_at(payload, encoding, payload_offset) {
        Ok(text) => (text, None),
        Err(CodecError::EncodingNotValid { valid_up_to }) if options.make_valid => {
            warn!(offset = valid_up_to, "invalid UTF-8 replaced with U+FFFD");
            let repaired = decode_repairing(payload, encoding)?;
            (
                repaired.text,
                repaired.first_invalid.map(|offset| offset + payload_offset),
            )
        }
        Err(err) => return Err(err),
    };
    if encoding == Encoding::Utf7 && write_bom && text.starts_with('\u{FEFF}') {
        text.remove(0);
    }

    let line_ending = find_line_ending(&text).unwrap_or(options.line_ending);
    let normalized = match normalize_on_load(&text) {
        std::borrow::Cow::Owned(normalized) => Some(normalized),
        std::borrow::Cow::Borrowed(_) => None,
    };
    let text = normalized.unwrap_or(text);

    Ok(LoadResult {
        text,
        encoding,
        line_ending,
        bom_length,
        write_bom,
        first_invalid,
        token: None,
        read_only: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn decode_with(bytes: &[u8], options: &LoadOptions) -> CodecResult<LoadResult> {
        decode_document(bytes, options, &mut AcceptBom)
    }

    #[test]
    fn test_load_utf8_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, "Hello, UTF-8!\nSecond line").unwrap();

        let result = load(&path, &LoadOptions::default()).unwrap();
        assert_eq!(result.text, "Hello, UTF-8!\nSecond line");
        assert_eq!(result.encoding, Encoding::Utf8);
        assert_eq!(result.line_ending, LineEnding::Unix);
        assert!(!result.write_bom);
        assert!(!result.read_only);
        assert!(result.token.is_some());
    }

    #[test]
    fn test_load_missing_file_must_exist() {
        let dir = tempdir().unwrap();
        let err = load(dir.path().join("missing.txt"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, CodecError::ReadingFailed { .. }));
    }

    #[test]
    fn test_load_missing_file_optional() {
        let dir = tempdir().unwrap();
        let options = LoadOptions {
            must_exist: false,
            line_ending: LineEnding::Mac,
            ..LoadOptions::with_encoding(Encoding::Iso8859_15)
        };
        let result = load(dir.path().join("missing.txt"), &options).unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.encoding, Encoding::Iso8859_15);
        assert_eq!(result.line_ending, LineEnding::Mac);
        assert!(result.token.is_none());
    }

    #[test]
    fn test_reading_a_directory_fails_even_when_optional() {
        let dir = tempdir().unwrap();
        let options = LoadOptions {
            must_exist: false,
            ..LoadOptions::default()
        };
        let err = load(dir.path(), &options).unwrap_err();
        assert!(matches!(err, CodecError::ReadingFailed { .. }));
    }

    #[test]
    fn test_utf16_bom_overrides_requested_encoding() {
        let bytes = [0xFF, 0xFE, b'h', 0, b'i', 0, b'\r', 0, b'\n', 0];
        let result = decode_with(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(result.encoding, Encoding::Utf16Le);
        assert_eq!(result.text, "hi\n");
        assert_eq!(result.line_ending, LineEnding::Dos);
        assert_eq!(result.bom_length, 2);
        assert!(result.write_bom);
    }

    #[test]
    fn test_rejected_bom_is_kept_in_the_text() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"abc");
        let options = LoadOptions::with_encoding(Encoding::Iso8859_1);
        let mut asked = Vec::new();
        let mut decider = |requested: Encoding, bom: Encoding| {
            asked.push((requested, bom));
            false
        };

        let result = decode_document(&bytes, &options, &mut decider).unwrap();
        assert_eq!(asked, [(Encoding::Iso8859_1, Encoding::Utf8)]);
        assert_eq!(result.encoding, Encoding::Iso8859_1);
        assert_eq!(result.text, "ï»¿abc");
        assert_eq!(result.bom_length, 0);
        assert!(!result.write_bom);
    }

    #[test]
    fn test_matching_bom_does_not_ask() {
        let bytes = [0xEF, 0xBB, 0xBF, b'x'];
        let mut decider = |_: Encoding, _: Encoding| -> bool { panic!("should not be asked") };
        let result = decode_document(&bytes, &LoadOptions::default(), &mut decider).unwrap();
        assert_eq!(result.text, "x");
        assert!(result.write_bom);
    }

    #[test]
    fn test_ignore_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'x'];
        let options = LoadOptions {
            ignore_bom: true,
            ..LoadOptions::default()
        };
        let result = decode_with(&bytes, &options).unwrap();
        assert_eq!(result.text, "\u{FEFF}x");
        assert!(!result.write_bom);
    }

    #[test]
    fn test_utf7_bom_is_stripped_from_decoded_text() {
        let result = decode_with(b"+/v8-hello", &LoadOptions::default()).unwrap();
        assert_eq!(result.encoding, Encoding::Utf7);
        assert_eq!(result.text, "hello");
        assert_eq!(result.bom_length, 4);
        assert!(result.write_bom);
    }

    #[test]
    fn test_utf7_bom_sharing_bits_with_next_character() {
        // U+FEFF followed by U+00E9 in a single base64 run
        let encoded = crate::encoding::encode("\u{FEFF}é", Encoding::Utf7).unwrap();
        assert!(encoded.starts_with(b"+/v"));
        let result = decode_with(&encoded, &LoadOptions::default()).unwrap();
        assert_eq!(result.encoding, Encoding::Utf7);
        assert_eq!(result.text, "é");
    }

    #[test]
    fn test_invalid_utf8_fails_without_make_valid() {
        let err = decode_with(b"ok\xFF", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, CodecError::EncodingNotValid { valid_up_to: 2 }));
    }

    #[test]
    fn test_decode_errors_count_bom_bytes() {
        let err = decode_with(&[0xEF, 0xBB, 0xBF, b'o', b'k', 0xFF], &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, CodecError::EncodingNotValid { valid_up_to: 5 }));

        // FF FE then a lone byte: the truncated unit sits at file byte 2
        let err = decode_with(&[0xFF, 0xFE, b'A'], &LoadOptions::default()).unwrap_err();
        match err {
            CodecError::ConvertingFailed { charset, message } => {
                assert_eq!(charset, "UTF-16LE");
                assert!(message.contains("byte 2"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_make_valid_offset_includes_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'o', b'k', 0xFF, b'\r', b'\n'];
        let options = LoadOptions {
            make_valid: true,
            ..LoadOptions::default()
        };
        let result = decode_with(&bytes, &options).unwrap();
        assert_eq!(result.text, "ok\u{FFFD}\n");
        assert_eq!(result.first_invalid, Some(5));
        assert_eq!(result.line_ending, LineEnding::Dos);
    }

    #[test]
    fn test_conversion_failure_is_not_repaired() {
        let options = LoadOptions {
            make_valid: true,
            ..LoadOptions::with_encoding(Encoding::Ascii)
        };
        let err = decode_with(b"caf\xE9", &options).unwrap_err();
        assert!(matches!(err, CodecError::ConvertingFailed { charset: "ASCII", .. }));
    }

    #[test]
    fn test_line_ending_fallback_for_single_line() {
        let options = LoadOptions {
            line_ending: LineEnding::Dos,
            ..LoadOptions::default()
        };
        let result = decode_with(b"single line", &options).unwrap();
        assert_eq!(result.line_ending, LineEnding::Dos);
    }

    #[test]
    fn test_load_latin1_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [b'c', b'a', b'f', 0xE9, b'\r']).unwrap();

        let result = load(&path, &LoadOptions::with_encoding(Encoding::Iso8859_1)).unwrap();
        assert_eq!(result.text, "café\n");
        assert_eq!(result.line_ending, LineEnding::Mac);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_flag() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("locked.txt");
        fs::write(&path, "locked").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

        let result = load(&path, &LoadOptions::default()).unwrap();
        assert!(result.read_only);
    }
}
