use super::Repaired;

/// Validate UTF-8 input, returning the length of the valid prefix on failure.
pub fn validate(bytes: &[u8]) -> Result<&str, usize> {
    std::str::from_utf8(bytes).map_err(|err| err.valid_up_to())
}

/// Replace every invalid sequence with U+FFFD.
pub fn make_valid(bytes: &[u8]) -> Repaired {
    match std::str::from_utf8(bytes) {
        Ok(text) => Repaired {
            text: text.to_owned(),
            first_invalid: None,
        },
        Err(err) => Repaired {
            text: String::from_utf8_lossy(bytes).into_owned(),
            first_invalid: Some(err.valid_up_to()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_valid_prefix() {
        assert_eq!(validate("héllo".as_bytes()), Ok("héllo"));
        assert_eq!(validate(b"ok\xC3"), Err(2));
    }

    #[test]
    fn test_make_valid_keeps_valid_input_untouched() {
        let repaired = make_valid("naïve".as_bytes());
        assert_eq!(repaired.text, "naïve");
        assert_eq!(repaired.first_invalid, None);
    }

    #[test]
    fn test_make_valid_replaces_each_bad_sequence() {
        let repaired = make_valid(b"a\xFFb\xFEc");
        assert_eq!(repaired.text, "a\u{FFFD}b\u{FFFD}c");
        assert_eq!(repaired.first_invalid, Some(1));
    }
}
