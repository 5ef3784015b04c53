use crate::encoding::Encoding;

/// Result of BOM detection containing the detected encoding and BOM length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BomDetectionResult {
    pub encoding: Encoding,
    pub bom_length: usize,
}

impl BomDetectionResult {
    const NONE: BomDetectionResult = BomDetectionResult {
        encoding: Encoding::None,
        bom_length: 0,
    };

    pub fn is_present(&self) -> bool {
        self.encoding != Encoding::None
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF32BE_BOM: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];
const UTF32LE_BOM: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];

/// Detect a Byte Order Mark at the start of `bytes`.
///
/// Looks at no more than four bytes. Longer signatures that share a prefix
/// with shorter ones are matched first.
pub fn detect_bom(bytes: &[u8]) -> BomDetectionResult {
    let (encoding, bom_length) = match bytes {
        [0x2B, 0x2F, 0x76, 0x38 | 0x39 | 0x2B | 0x2F, ..] => (Encoding::Utf7, 4),
        [0xEF, 0xBB, 0xBF, ..] => (Encoding::Utf8, 3),
        [0xFE, 0xFF, ..] => (Encoding::Utf16Be, 2),
        [0xFF, 0xFE, 0x00, 0x00, ..] => (Encoding::Utf32Le, 4),
        [0xFF, 0xFE, ..] => (Encoding::Utf16Le, 2),
        [0x00, 0x00, 0xFE, 0xFF, ..] => (Encoding::Utf32Be, 4),
        _ => return BomDetectionResult::NONE,
    };
    BomDetectionResult { encoding, bom_length }
}

/// BOM bytes to prepend when saving in `encoding`.
///
/// A UTF-7 BOM is never written; the request is answered with the UTF-8 BOM
/// and [`bom_encoding`] reports UTF-8 as the encoding to write the body in.
pub fn write_bom(encoding: Encoding) -> Option<&'static [u8]> {
    match encoding {
        Encoding::Utf7 | Encoding::Utf8 => Some(UTF8_BOM),
        Encoding::Utf16Be => Some(UTF16BE_BOM),
        Encoding::Utf16Le => Some(UTF16LE_BOM),
        Encoding::Utf32Be => Some(UTF32BE_BOM),
        Encoding::Utf32Le => Some(UTF32LE_BOM),
        _ => None,
    }
}

/// Encoding the body must be written in when a BOM is requested for `encoding`.
pub fn bom_encoding(encoding: Encoding) -> Encoding {
    match encoding {
        Encoding::Utf7 => Encoding::Utf8,
        other => other,
    }
}
