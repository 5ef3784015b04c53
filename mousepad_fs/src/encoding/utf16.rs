use super::{Endian, Fault};

/// Decode UTF-16 code units in the given byte order.
pub fn decode(bytes: &[u8], endian: Endian) -> Result<String, Fault> {
    if bytes.len() % 2 != 0 {
        return Err(Fault::new(bytes.len() - 1, "incomplete UTF-16 code unit"));
    }

    let units = bytes.chunks_exact(2).map(|pair| {
        let pair = [pair[0], pair[1]];
        match endian {
            Endian::Little => u16::from_le_bytes(pair),
            Endian::Big => u16::from_be_bytes(pair),
        }
    });

    let mut text = String::with_capacity(bytes.len() / 2);
    let mut offset = 0;
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(c) => {
                offset += c.len_utf16() * 2;
                text.push(c);
            }
            Err(_) => return Err(Fault::new(offset, "unpaired UTF-16 surrogate")),
        }
    }
    Ok(text)
}

pub fn encode(text: &str, endian: Endian) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        let pair = match endian {
            Endian::Little => unit.to_le_bytes(),
            Endian::Big => unit.to_be_bytes(),
        };
        out.extend_from_slice(&pair);
    }
    out
}
