use super::{Endian, Fault};

/// Decode UTF-32 code points in the given byte order.
pub fn decode(bytes: &[u8], endian: Endian) -> Result<String, Fault> {
    if bytes.len() % 4 != 0 {
        return Err(Fault::new(
            bytes.len() - bytes.len() % 4,
            "incomplete UTF-32 code point",
        ));
    }

    let mut text = String::with_capacity(bytes.len() / 4);
    for (index, quad) in bytes.chunks_exact(4).enumerate() {
        let quad = [quad[0], quad[1], quad[2], quad[3]];
        let code = match endian {
            Endian::Little => u32::from_le_bytes(quad),
            Endian::Big => u32::from_be_bytes(quad),
        };
        match char::from_u32(code) {
            Some(c) => text.push(c),
            None => {
                return Err(Fault::new(
                    index * 4,
                    format!("invalid code point 0x{code:08X}"),
                ));
            }
        }
    }
    Ok(text)
}

pub fn encode(text: &str, endian: Endian) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 4);
    for c in text.chars() {
        let quad = match endian {
            Endian::Little => (c as u32).to_le_bytes(),
            Endian::Big => (c as u32).to_be_bytes(),
        };
        out.extend_from_slice(&quad);
    }
    out
}
