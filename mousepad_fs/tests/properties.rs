//! Codec property tests
//!
//! Exercise only the public API: line-ending restoration must invert
//! normalization, and every supported charset must decode what it encodes.

use mousepad_fs::{Encoding, LineEnding, decode, denormalize_on_save, encode, find_line_ending, normalize_on_load};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

fn line_ending_strategy() -> impl Strategy<Value = LineEnding> {
    prop_oneof![Just(LineEnding::Unix), Just(LineEnding::Dos), Just(LineEnding::Mac)]
}

/// Unicode text as it exists in memory: `\n` only
fn normalized_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<char>().prop_filter("no carriage returns", |c| *c != '\r'), 0..48)
        .prop_map(|chars| chars.into_iter().collect())
}

fn supported_encoding() -> impl Strategy<Value = Encoding> {
    let supported: Vec<Encoding> = Encoding::ALL.iter().copied().filter(|e| e.is_supported()).collect();
    proptest::sample::select(supported)
}

fn legacy_encoding() -> impl Strategy<Value = Encoding> {
    let legacy: Vec<Encoding> = Encoding::ALL
        .iter()
        .copied()
        .filter(|e| e.is_supported() && !e.is_unicode())
        .collect();
    proptest::sample::select(legacy)
}

/// Charsets whose every decoded character has a byte of its own
fn single_byte_encoding() -> impl Strategy<Value = Encoding> {
    proptest::sample::select(vec![
        Encoding::Iso8859_2,
        Encoding::Iso8859_5,
        Encoding::Iso8859_7,
        Encoding::Iso8859_15,
        Encoding::Windows1250,
        Encoding::Windows1251,
        Encoding::Windows1252,
        Encoding::Koi8R,
        Encoding::MacRoman,
    ])
}

/// Text drawn from the blocks legacy charsets cover, plus their look-alikes
fn legacy_text() -> impl Strategy<Value = String> {
    let chars = prop_oneof![
        proptest::char::range(' ', '~'),
        proptest::char::range('\u{A0}', '\u{FF}'),
        proptest::char::range('\u{370}', '\u{4FF}'),
        proptest::char::range('\u{2010}', '\u{2044}'),
        proptest::char::range('\u{2200}', '\u{2212}'),
        proptest::char::range('\u{3000}', '\u{30FF}'),
        proptest::char::range('\u{4E00}', '\u{4FFF}'),
        proptest::char::range('\u{AC00}', '\u{AD00}'),
        proptest::char::range('\u{FF01}', '\u{FFE6}'),
    ];
    proptest::collection::vec(chars, 0..24).prop_map(|chars| chars.into_iter().collect())
}

fn unicode_encoding() -> impl Strategy<Value = Encoding> {
    let unicode: Vec<Encoding> = Encoding::ALL.iter().copied().filter(|e| e.is_unicode()).collect();
    proptest::sample::select(unicode)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn restoring_line_endings_inverts_normalization(text in normalized_text(), line_ending in line_ending_strategy()) {
        let restored = denormalize_on_save(&text, line_ending, false);
        prop_assert_eq!(normalize_on_load(&restored), text.as_str());
    }

    #[test]
    fn restored_text_is_detected_with_its_line_ending(text in normalized_text(), line_ending in line_ending_strategy()) {
        let restored = denormalize_on_save(&text, line_ending, false);
        let expected = text.contains('\n').then_some(line_ending);
        prop_assert_eq!(find_line_ending(&restored), expected);
    }

    #[test]
    fn trailing_terminator_is_added_once(text in normalized_text(), line_ending in line_ending_strategy()) {
        let once = denormalize_on_save(&text, line_ending, true).into_owned();
        let twice = denormalize_on_save(&normalize_on_load(&once), line_ending, true).into_owned();
        prop_assert_eq!(&once, &twice);
        if !text.is_empty() {
            prop_assert!(once.ends_with(line_ending.as_str()));
        }
    }

    #[test]
    fn printable_ascii_survives_every_supported_charset(text in "[ -~\n]{0,64}", encoding in supported_encoding()) {
        let bytes = encode(&text, encoding).unwrap();
        prop_assert_eq!(decode(&bytes, encoding).unwrap(), text);
    }

    #[test]
    fn legacy_encode_is_lossless_or_fails(text in legacy_text(), encoding in legacy_encoding()) {
        if let Ok(bytes) = encode(&text, encoding) {
            prop_assert_eq!(decode(&bytes, encoding).unwrap(), text);
        }
    }

    #[test]
    fn decoded_legacy_text_reads_back_unchanged(
        bytes in proptest::collection::vec(any::<u8>(), 0..64),
        encoding in legacy_encoding(),
    ) {
        // some decoded characters have no way back (Big5 pairs, ISO-2022-JP
        // half-width katakana); those must fail rather than change
        if let Ok(text) = decode(&bytes, encoding) {
            if let Ok(encoded) = encode(&text, encoding) {
                prop_assert_eq!(decode(&encoded, encoding).unwrap(), text);
            }
        }
    }

    #[test]
    fn single_byte_charsets_encode_what_they_decode(
        bytes in proptest::collection::vec(any::<u8>(), 0..64),
        encoding in single_byte_encoding(),
    ) {
        if let Ok(text) = decode(&bytes, encoding) {
            let encoded = encode(&text, encoding).unwrap();
            prop_assert_eq!(decode(&encoded, encoding).unwrap(), text);
        }
    }

    #[test]
    fn unicode_charsets_round_trip_any_text(text in any::<String>(), encoding in unicode_encoding()) {
        let bytes = encode(&text, encoding).unwrap();
        prop_assert_eq!(decode(&bytes, encoding).unwrap(), text);
    }

    #[test]
    fn latin1_round_trips_every_byte(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let text = decode(&bytes, Encoding::Iso8859_1).unwrap();
        prop_assert_eq!(encode(&text, Encoding::Iso8859_1).unwrap(), bytes);
    }
}
