//! Charset table and conversion dispatch.
//!
//! Every [`Encoding`] maps to a canonical charset name, a label and a menu
//! group. Conversion is routed to a backend per encoding: the Unicode family,
//! ISO-8859-1 and ASCII are converted here; everything else goes through
//! `encoding_rs`.

use std::fmt;
use std::str::FromStr;

use encoding_rs::{DecoderResult, EncoderResult};

use crate::error::{CodecError, CodecResult};

mod latin;
mod utf16;
mod utf32;
mod utf7;
mod utf8;

/// Section of the encoding menu an encoding is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingGroup {
    None,
    Unicode,
    WesternEuropean,
    CentralEuropean,
    SouthEuropean,
    Baltic,
    Cyrillic,
    Arabic,
    Greek,
    Hebrew,
    Turkish,
    Nordic,
    Celtic,
    Romanian,
    Thai,
    Vietnamese,
    ChineseSimplified,
    ChineseTraditional,
    Japanese,
    Korean,
    Armenian,
}

impl EncodingGroup {
    pub fn title(self) -> &'static str {
        match self {
            EncodingGroup::None => "None",
            EncodingGroup::Unicode => "Unicode",
            EncodingGroup::WesternEuropean => "Western European",
            EncodingGroup::CentralEuropean => "Central European",
            EncodingGroup::SouthEuropean => "South European",
            EncodingGroup::Baltic => "Baltic",
            EncodingGroup::Cyrillic => "Cyrillic",
            EncodingGroup::Arabic => "Arabic",
            EncodingGroup::Greek => "Greek",
            EncodingGroup::Hebrew => "Hebrew",
            EncodingGroup::Turkish => "Turkish",
            EncodingGroup::Nordic => "Nordic",
            EncodingGroup::Celtic => "Celtic",
            EncodingGroup::Romanian => "Romanian",
            EncodingGroup::Thai => "Thai",
            EncodingGroup::Vietnamese => "Vietnamese",
            EncodingGroup::ChineseSimplified => "Chinese Simplified",
            EncodingGroup::ChineseTraditional => "Chinese Traditional",
            EncodingGroup::Japanese => "Japanese",
            EncodingGroup::Korean => "Korean",
            EncodingGroup::Armenian => "Armenian",
        }
    }
}

/// A text encoding known to the editor.
///
/// `None` is the unset sentinel and is never a valid conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    None,
    Utf7,
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    Ascii,
    Iso8859_1,
    Iso8859_15,
    Windows1252,
    MacRoman,
    Ibm850,
    Iso8859_2,
    Windows1250,
    Iso8859_3,
    Iso8859_4,
    Iso8859_13,
    Windows1257,
    Iso8859_5,
    Windows1251,
    Koi8R,
    Koi8U,
    Ibm866,
    MacCyrillic,
    Iso8859_6,
    Windows1256,
    Iso8859_7,
    Windows1253,
    Iso8859_8,
    Iso8859_8I,
    Windows1255,
    Iso8859_9,
    Windows1254,
    Iso8859_10,
    Iso8859_14,
    Iso8859_16,
    Tis620,
    Windows874,
    Windows1258,
    Tcvn,
    Viscii,
    Gb2312,
    Gbk,
    Gb18030,
    Hz,
    Big5,
    Big5Hkscs,
    EucTw,
    EucJp,
    Iso2022Jp,
    ShiftJis,
    EucKr,
    Iso2022Kr,
    Johab,
    Uhc,
    Armscii8,
}

impl Encoding {
    /// Every encoding except the `None` sentinel, in menu order.
    pub const ALL: &'static [Encoding] = &[
        Encoding::Utf7,
        Encoding::Utf8,
        Encoding::Utf16Le,
        Encoding::Utf16Be,
        Encoding::Utf32Le,
        Encoding::Utf32Be,
        Encoding::Ascii,
        Encoding::Iso8859_1,
        Encoding::Iso8859_15,
        Encoding::Windows1252,
        Encoding::MacRoman,
        Encoding::Ibm850,
        Encoding::Iso8859_2,
        Encoding::Windows1250,
        Encoding::Iso8859_3,
        Encoding::Iso8859_4,
        Encoding::Iso8859_13,
        Encoding::Windows1257,
        Encoding::Iso8859_5,
        Encoding::Windows1251,
        Encoding::Koi8R,
        Encoding::Koi8U,
        Encoding::Ibm866,
        Encoding::MacCyrillic,
        Encoding::Iso8859_6,
        Encoding::Windows1256,
        Encoding::Iso8859_7,
        Encoding::Windows1253,
        Encoding::Iso8859_8,
        Encoding::Iso8859_8I,
        Encoding::Windows1255,
        Encoding::Iso8859_9,
        Encoding::Windows1254,
        Encoding::Iso8859_10,
        Encoding::Iso8859_14,
        Encoding::Iso8859_16,
        Encoding::Tis620,
        Encoding::Windows874,
        Encoding::Windows1258,
        Encoding::Tcvn,
        Encoding::Viscii,
        Encoding::Gb2312,
        Encoding::Gbk,
        Encoding::Gb18030,
        Encoding::Hz,
        Encoding::Big5,
        Encoding::Big5Hkscs,
        Encoding::EucTw,
        Encoding::EucJp,
        Encoding::Iso2022Jp,
        Encoding::ShiftJis,
        Encoding::EucKr,
        Encoding::Iso2022Kr,
        Encoding::Johab,
        Encoding::Uhc,
        Encoding::Armscii8,
    ];

    /// Canonical charset name, as passed to a charset converter.
    pub fn charset(self) -> &'static str {
        self.describe().0
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        self.describe().1
    }

    pub fn group(self) -> EncodingGroup {
        self.describe().2
    }

    fn describe(self) -> (&'static str, &'static str, EncodingGroup) {
        use EncodingGroup as G;
        match self {
            Encoding::None => ("", "None", G::None),
            Encoding::Utf7 => ("UTF-7", "Unicode", G::Unicode),
            Encoding::Utf8 => ("UTF-8", "Unicode", G::Unicode),
            Encoding::Utf16Le => ("UTF-16LE", "Unicode", G::Unicode),
            Encoding::Utf16Be => ("UTF-16BE", "Unicode", G::Unicode),
            Encoding::Utf32Le => ("UTF-32LE", "Unicode", G::Unicode),
            Encoding::Utf32Be => ("UTF-32BE", "Unicode", G::Unicode),
            Encoding::Ascii => ("ASCII", "US-ASCII", G::WesternEuropean),
            Encoding::Iso8859_1 => ("ISO-8859-1", "Western", G::WesternEuropean),
            Encoding::Iso8859_15 => ("ISO-8859-15", "Western", G::WesternEuropean),
            Encoding::Windows1252 => ("WINDOWS-1252", "Western", G::WesternEuropean),
            Encoding::MacRoman => ("MACINTOSH", "Western", G::WesternEuropean),
            Encoding::Ibm850 => ("IBM850", "Western", G::WesternEuropean),
            Encoding::Iso8859_2 => ("ISO-8859-2", "Central European", G::CentralEuropean),
            Encoding::Windows1250 => ("WINDOWS-1250", "Central European", G::CentralEuropean),
            Encoding::Iso8859_3 => ("ISO-8859-3", "South European", G::SouthEuropean),
            Encoding::Iso8859_4 => ("ISO-8859-4", "Baltic", G::Baltic),
            Encoding::Iso8859_13 => ("ISO-8859-13", "Baltic", G::Baltic),
            Encoding::Windows1257 => ("WINDOWS-1257", "Baltic", G::Baltic),
            Encoding::Iso8859_5 => ("ISO-8859-5", "Cyrillic", G::Cyrillic),
            Encoding::Windows1251 => ("WINDOWS-1251", "Cyrillic", G::Cyrillic),
            Encoding::Koi8R => ("KOI8-R", "Russian", G::Cyrillic),
            Encoding::Koi8U => ("KOI8-U", "Ukrainian", G::Cyrillic),
            Encoding::Ibm866 => ("IBM866", "Cyrillic/Russian", G::Cyrillic),
            Encoding::MacCyrillic => ("MAC_CYRILLIC", "Cyrillic", G::Cyrillic),
            Encoding::Iso8859_6 => ("ISO-8859-6", "Arabic", G::Arabic),
            Encoding::Windows1256 => ("WINDOWS-1256", "Arabic", G::Arabic),
            Encoding::Iso8859_7 => ("ISO-8859-7", "Greek", G::Greek),
            Encoding::Windows1253 => ("WINDOWS-1253", "Greek", G::Greek),
            Encoding::Iso8859_8 => ("ISO-8859-8", "Hebrew Visual", G::Hebrew),
            Encoding::Iso8859_8I => ("ISO-8859-8-I", "Hebrew", G::Hebrew),
            Encoding::Windows1255 => ("WINDOWS-1255", "Hebrew", G::Hebrew),
            Encoding::Iso8859_9 => ("ISO-8859-9", "Turkish", G::Turkish),
            Encoding::Windows1254 => ("WINDOWS-1254", "Turkish", G::Turkish),
            Encoding::Iso8859_10 => ("ISO-8859-10", "Nordic", G::Nordic),
            Encoding::Iso8859_14 => ("ISO-8859-14", "Celtic", G::Celtic),
            Encoding::Iso8859_16 => ("ISO-8859-16", "Romanian", G::Romanian),
            Encoding::Tis620 => ("TIS-620", "Thai", G::Thai),
            Encoding::Windows874 => ("WINDOWS-874", "Thai", G::Thai),
            Encoding::Windows1258 => ("WINDOWS-1258", "Vietnamese", G::Vietnamese),
            Encoding::Tcvn => ("TCVN", "Vietnamese", G::Vietnamese),
            Encoding::Viscii => ("VISCII", "Vietnamese", G::Vietnamese),
            Encoding::Gb2312 => ("GB2312", "Chinese Simplified", G::ChineseSimplified),
            Encoding::Gbk => ("GBK", "Chinese Simplified", G::ChineseSimplified),
            Encoding::Gb18030 => ("GB18030", "Chinese Simplified", G::ChineseSimplified),
            Encoding::Hz => ("HZ", "Chinese Simplified", G::ChineseSimplified),
            Encoding::Big5 => ("BIG5", "Chinese Traditional", G::ChineseTraditional),
            Encoding::Big5Hkscs => ("BIG5-HKSCS", "Chinese Traditional", G::ChineseTraditional),
            Encoding::EucTw => ("EUC-TW", "Chinese Traditional", G::ChineseTraditional),
            Encoding::EucJp => ("EUC-JP", "Japanese", G::Japanese),
            Encoding::Iso2022Jp => ("ISO-2022-JP", "Japanese", G::Japanese),
            Encoding::ShiftJis => ("SHIFT_JIS", "Japanese", G::Japanese),
            Encoding::EucKr => ("EUC-KR", "Korean", G::Korean),
            Encoding::Iso2022Kr => ("ISO-2022-KR", "Korean", G::Korean),
            Encoding::Johab => ("JOHAB", "Korean", G::Korean),
            Encoding::Uhc => ("UHC", "Korean", G::Korean),
            Encoding::Armscii8 => ("ARMSCII-8", "Armenian", G::Armenian),
        }
    }

    /// Look up an encoding by charset name. Case, `_` versus `-`, and a few
    /// common aliases are tolerated.
    pub fn from_charset(name: &str) -> Option<Encoding> {
        let wanted = fold_charset(name);
        if wanted.is_empty() {
            return None;
        }
        if let Some(found) = Encoding::ALL
            .iter()
            .copied()
            .find(|encoding| fold_charset(encoding.charset()) == wanted)
        {
            return Some(found);
        }
        let alias = match wanted.as_str() {
            "UTF8" => Encoding::Utf8,
            "UTF7" => Encoding::Utf7,
            "UTF16LE" => Encoding::Utf16Le,
            "UTF16BE" => Encoding::Utf16Be,
            "UTF32LE" => Encoding::Utf32Le,
            "UTF32BE" => Encoding::Utf32Be,
            "US-ASCII" | "ANSI-X3.4-1968" => Encoding::Ascii,
            "LATIN1" | "LATIN-1" | "ISO8859-1" => Encoding::Iso8859_1,
            "LATIN9" | "LATIN-9" | "ISO8859-15" => Encoding::Iso8859_15,
            "CP1252" => Encoding::Windows1252,
            "CP1251" => Encoding::Windows1251,
            "CP1250" => Encoding::Windows1250,
            "CP866" => Encoding::Ibm866,
            "SJIS" | "MS-KANJI" | "SHIFT-JIS" => Encoding::ShiftJis,
            "EUCJP" => Encoding::EucJp,
            "EUCKR" => Encoding::EucKr,
            "CP949" => Encoding::Uhc,
            _ => return None,
        };
        Some(alias)
    }

    /// Whether a converter is available for this encoding.
    pub fn is_supported(self) -> bool {
        self.backend().is_some()
    }

    pub fn is_unicode(self) -> bool {
        self.group() == EncodingGroup::Unicode
    }

    fn backend(self) -> Option<Backend> {
        match self {
            Encoding::None => None,
            Encoding::Utf7 => Some(Backend::Utf7),
            Encoding::Utf8 => Some(Backend::Utf8),
            Encoding::Utf16Le => Some(Backend::Utf16(Endian::Little)),
            Encoding::Utf16Be => Some(Backend::Utf16(Endian::Big)),
            Encoding::Utf32Le => Some(Backend::Utf32(Endian::Little)),
            Encoding::Utf32Be => Some(Backend::Utf32(Endian::Big)),
            Encoding::Iso8859_1 => Some(Backend::Latin1),
            Encoding::Ascii => Some(Backend::Ascii),
            other => other
                .web_label()
                .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
                // The replacement encoding swallows its input and the UTF-16
                // codecs cannot encode, so neither counts as a converter.
                .filter(|codec| *codec != encoding_rs::REPLACEMENT && codec.output_encoding() == *codec)
                .map(Backend::Web),
        }
    }

    fn web_label(self) -> Option<&'static str> {
        let label = match self {
            Encoding::Iso8859_15 => "iso-8859-15",
            Encoding::Windows1252 => "windows-1252",
            Encoding::MacRoman => "macintosh",
            Encoding::Iso8859_2 => "iso-8859-2",
            Encoding::Windows1250 => "windows-1250",
            Encoding::Iso8859_3 => "iso-8859-3",
            Encoding::Iso8859_4 => "iso-8859-4",
            Encoding::Iso8859_13 => "iso-8859-13",
            Encoding::Windows1257 => "windows-1257",
            Encoding::Iso8859_5 => "iso-8859-5",
            Encoding::Windows1251 => "windows-1251",
            Encoding::Koi8R => "koi8-r",
            Encoding::Koi8U => "koi8-u",
            Encoding::Ibm866 => "ibm866",
            Encoding::MacCyrillic => "x-mac-cyrillic",
            Encoding::Iso8859_6 => "iso-8859-6",
            Encoding::Windows1256 => "windows-1256",
            Encoding::Iso8859_7 => "iso-8859-7",
            Encoding::Windows1253 => "windows-1253",
            Encoding::Iso8859_8 => "iso-8859-8",
            Encoding::Iso8859_8I => "iso-8859-8-i",
            Encoding::Windows1255 => "windows-1255",
            Encoding::Iso8859_9 => "iso-8859-9",
            Encoding::Windows1254 => "windows-1254",
            Encoding::Iso8859_10 => "iso-8859-10",
            Encoding::Iso8859_14 => "iso-8859-14",
            Encoding::Iso8859_16 => "iso-8859-16",
            Encoding::Tis620 => "tis-620",
            Encoding::Windows874 => "windows-874",
            Encoding::Windows1258 => "windows-1258",
            Encoding::Gb2312 => "gb2312",
            Encoding::Gbk => "gbk",
            Encoding::Gb18030 => "gb18030",
            Encoding::Big5 => "big5",
            Encoding::Big5Hkscs => "big5-hkscs",
            Encoding::EucJp => "euc-jp",
            Encoding::Iso2022Jp => "iso-2022-jp",
            Encoding::ShiftJis => "shift_jis",
            Encoding::EucKr => "euc-kr",
            Encoding::Uhc => "windows-949",
            _ => return None,
        };
        Some(label)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::None => write!(f, "None"),
            other => f.write_str(other.charset()),
        }
    }
}

impl FromStr for Encoding {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Encoding::from_charset(s).ok_or_else(|| CodecError::UnsupportedEncoding {
            charset: s.to_string(),
        })
    }
}

fn fold_charset(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c == '_' { '-' } else { c.to_ascii_uppercase() })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy)]
enum Backend {
    Utf8,
    Utf7,
    Utf16(Endian),
    Utf32(Endian),
    Latin1,
    Ascii,
    Web(&'static encoding_rs::Encoding),
}

/// Where and why a backend rejected its input.
#[derive(Debug)]
pub(crate) struct Fault {
    offset: usize,
    reason: String,
}

impl Fault {
    pub(crate) fn new(offset: usize, reason: impl Into<String>) -> Self {
        Fault {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn unrepresentable(c: char, offset: usize) -> Self {
        Fault::new(
            offset,
            format!("character U+{:04X} cannot be represented", c as u32),
        )
    }

    fn shifted(mut self, by: usize) -> Self {
        self.offset += by;
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.reason, self.offset)
    }
}

/// Text produced by a decode that was allowed to repair invalid input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    /// Byte offset where the first run of valid input ended, if any repair happened.
    pub first_invalid: Option<usize>,
}

fn unsupported(encoding: Encoding) -> CodecError {
    CodecError::UnsupportedEncoding {
        charset: encoding.to_string(),
    }
}

/// Convert raw bytes in `encoding` to text.
///
/// UTF-8 input is validated without conversion and reports
/// [`CodecError::EncodingNotValid`]; other charsets report
/// [`CodecError::ConvertingFailed`] on malformed input.
pub fn decode(bytes: &[u8], encoding: Encoding) -> CodecResult<String> {
    decode_at(bytes, encoding, 0)
}

/// [`decode`] for bytes found `offset` bytes into a file. Reported
/// positions count from the start of the file.
pub(crate) fn decode_at(bytes: &[u8], encoding: Encoding, offset: usize) -> CodecResult<String> {
    let backend = encoding.backend().ok_or_else(|| unsupported(encoding))?;
    let converted = match backend {
        Backend::Utf8 => {
            return utf8::validate(bytes)
                .map(str::to_owned)
                .map_err(|valid_up_to| CodecError::EncodingNotValid {
                    valid_up_to: valid_up_to + offset,
                });
        }
        Backend::Utf7 => utf7::decode(bytes),
        Backend::Utf16(endian) => utf16::decode(bytes, endian),
        Backend::Utf32(endian) => utf32::decode(bytes, endian),
        Backend::Latin1 => Ok(latin::decode_latin1(bytes)),
        Backend::Ascii => latin::decode_ascii(bytes),
        Backend::Web(codec) => decode_web(bytes, codec),
    };
    converted.map_err(|fault| CodecError::ConvertingFailed {
        charset: encoding.charset(),
        message: fault.shifted(offset).to_string(),
    })
}

/// Like [`decode`], but invalid UTF-8 is replaced with U+FFFD instead of failing.
pub fn decode_repairing(bytes: &[u8], encoding: Encoding) -> CodecResult<Repaired> {
    match encoding.backend() {
        Some(Backend::Utf8) => Ok(utf8::make_valid(bytes)),
        _ => decode(bytes, encoding).map(|text| Repaired {
            text,
            first_invalid: None,
        }),
    }
}

/// Convert text to raw bytes in `encoding`.
pub fn encode(text: &str, encoding: Encoding) -> CodecResult<Vec<u8>> {
    let backend = encoding.backend().ok_or_else(|| unsupported(encoding))?;
    let converted = match backend {
        Backend::Utf8 => Ok(text.as_bytes().to_vec()),
        Backend::Utf7 => Ok(utf7::encode(text)),
        Backend::Utf16(endian) => Ok(utf16::encode(text, endian)),
        Backend::Utf32(endian) => Ok(utf32::encode(text, endian)),
        Backend::Latin1 => latin::encode_latin1(text),
        Backend::Ascii => latin::encode_ascii(text),
        Backend::Web(codec) => encode_web(text, codec),
    };
    converted.map_err(|fault| CodecError::ConvertingFailed {
        charset: encoding.charset(),
        message: fault.to_string(),
    })
}

fn decode_web(bytes: &[u8], codec: &'static encoding_rs::Encoding) -> Result<String, Fault> {
    let mut decoder = codec.new_decoder_without_bom_handling();
    let capacity = decoder
        .max_utf8_buffer_length_without_replacement(bytes.len())
        .unwrap_or_else(|| bytes.len().saturating_mul(3));
    let mut text = String::with_capacity(capacity);
    let (result, read) = decoder.decode_to_string_without_replacement(bytes, &mut text, true);
    match result {
        DecoderResult::InputEmpty => Ok(text),
        DecoderResult::Malformed(bad, trailing) => Err(Fault::new(
            read.saturating_sub(bad as usize + trailing as usize),
            "invalid byte sequence",
        )),
        DecoderResult::OutputFull => Err(Fault::new(read, "converted text does not fit")),
    }
}

fn encode_web(text: &str, codec: &'static encoding_rs::Encoding) -> Result<Vec<u8>, Fault> {
    let mut encoder = codec.new_encoder();
    let capacity = encoder
        .max_buffer_length_from_utf8_without_replacement(text.len())
        .unwrap_or(text.len());
    let mut out = Vec::with_capacity(capacity);
    let mut consumed = 0;
    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(&text[consumed..], &mut out, true);
        consumed += read;
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => out.reserve(out.capacity().max(16)),
            EncoderResult::Unmappable(c) => {
                return Err(Fault::unrepresentable(c, consumed - c.len_utf8()));
            }
        }
    }
    check_round_trip(text, &out, codec)?;
    Ok(out)
}

/// The WHATWG encoders map a few characters to look-alikes (U+00A5 to a
/// backslash in Shift_JIS, half-width katakana to full-width in ISO-2022-JP) instead
/// of reporting them. Reject those so a save never changes the text.
fn check_round_trip(text: &str, bytes: &[u8], codec: &'static encoding_rs::Encoding) -> Result<(), Fault> {
    let decoded = decode_web(bytes, codec)?;
    if decoded == text {
        return Ok(());
    }

    let mut reread = decoded.chars();
    for (offset, c) in text.char_indices() {
        if reread.next() != Some(c) {
            return Err(Fault::unrepresentable(c, offset));
        }
    }
    Err(Fault::new(text.len(), "converted text does not read back"))
}
