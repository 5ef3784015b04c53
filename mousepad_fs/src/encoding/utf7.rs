//! UTF-7 (RFC 2152). `encoding_rs` has no UTF-7 codec, so it lives here.

use super::Fault;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_value(byte: u8) -> Option<u32> {
    let value = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(u32::from(value))
}

/// Characters written as themselves; everything else goes through base64.
fn is_direct(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '\'' | '(' | ')' | ',' | '-' | '.' | '/' | ':' | '?' | ' ' | '\t' | '\r' | '\n')
}

pub fn decode(bytes: &[u8]) -> Result<String, Fault> {
    let mut text = String::with_capacity(bytes.len());
    let mut units: Vec<u16> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if !byte.is_ascii() {
            return Err(Fault::new(i, "byte outside the 7-bit range"));
        }
        if byte != b'+' {
            text.push(char::from(byte));
            i += 1;
            continue;
        }

        let start = i;
        i += 1;
        if bytes.get(i) == Some(&b'-') {
            text.push('+');
            i += 1;
            continue;
        }

        let mut acc: u32 = 0;
        let mut bits = 0;
        while let Some(value) = bytes.get(i).copied().and_then(base64_value) {
            acc = (acc << 6) | value;
            bits += 6;
            if bits >= 16 {
                bits -= 16;
                units.push((acc >> bits) as u16);
                acc &= (1 << bits) - 1;
            }
            i += 1;
        }
        if i == start + 1 {
            return Err(Fault::new(start, "shift character without base64 run"));
        }
        // leftover padding must be shorter than one base64 digit and all zero
        if bits >= 6 || acc != 0 {
            return Err(Fault::new(start, "malformed base64 run"));
        }
        for decoded in char::decode_utf16(units.drain(..)) {
            let c = decoded.map_err(|_| Fault::new(start, "unpaired UTF-16 surrogate"))?;
            text.push(c);
        }
        if bytes.get(i) == Some(&b'-') {
            i += 1;
        }
    }

    Ok(text)
}

pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut pending: Vec<u16> = Vec::new();

    for c in text.chars() {
        if is_direct(c) {
            flush_base64(&mut pending, &mut out);
            out.push(c as u8);
        } else if c == '+' && pending.is_empty() {
            out.extend_from_slice(b"+-");
        } else {
            let mut buf = [0u16; 2];
            pending.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    flush_base64(&mut pending, &mut out);

    out
}

fn flush_base64(units: &mut Vec<u16>, out: &mut Vec<u8>) {
    if units.is_empty() {
        return;
    }
    out.push(b'+');
    let mut acc: u32 = 0;
    let mut bits = 0;
    for unit in units.drain(..) {
        acc = (acc << 16) | u32::from(unit);
        bits += 16;
        while bits >= 6 {
            bits -= 6;
            out.push(BASE64[((acc >> bits) & 0x3F) as usize]);
        }
        acc &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(BASE64[((acc << (6 - bits)) & 0x3F) as usize]);
    }
    out.push(b'-');
}
