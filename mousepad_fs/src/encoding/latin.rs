use super::Fault;

/// ISO-8859-1 maps every byte to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

pub fn encode_latin1(text: &str) -> Result<Vec<u8>, Fault> {
    text.char_indices()
        .map(|(offset, c)| u8::try_from(c).map_err(|_| Fault::unrepresentable(c, offset)))
        .collect()
}

pub fn decode_ascii(bytes: &[u8]) -> Result<String, Fault> {
    match bytes.iter().position(|byte| !byte.is_ascii()) {
        Some(offset) => Err(Fault::new(
            offset,
            format!("byte 0x{:02X} is outside ASCII", bytes[offset]),
        )),
        None => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
    }
}

pub fn encode_ascii(text: &str) -> Result<Vec<u8>, Fault> {
    match text.char_indices().find(|(_, c)| !c.is_ascii()) {
        Some((offset, c)) => Err(Fault::unrepresentable(c, offset)),
        None => Ok(text.as_bytes().to_vec()),
    }
}
