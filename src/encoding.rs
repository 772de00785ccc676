//! Binary-to-text encoding for report bodies
//!
//! Standard base64 (RFC 4648 §4): three input bytes become four symbols from
//! `A-Z a-z 0-9 + /`, and a trailing one- or two-byte group is padded with
//! `==` or `=`. This is the only encoder the crate uses; its output is
//! byte-identical to any conforming base64 implementation.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const PAD: char = '=';

/// Length of the encoded form of `len` input bytes, padding included
pub fn encoded_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

/// Encode a byte buffer as padded base64
///
/// # Example
///
/// ```
/// use report_dl::encoding::encode;
///
/// assert_eq!(encode(b"foobar"), "Zm9vYmFy");
/// assert_eq!(encode(b"fo"), "Zm8=");
/// assert_eq!(encode(b""), "");
/// ```
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(encoded_len(bytes.len()));
    let mut groups = bytes.chunks_exact(3);

    for group in &mut groups {
        let n = u32::from(group[0]) << 16 | u32::from(group[1]) << 8 | u32::from(group[2]);
        push_symbols(&mut out, n, 4);
    }

    match *groups.remainder() {
        [a] => {
            push_symbols(&mut out, u32::from(a) << 16, 2);
            out.push(PAD);
            out.push(PAD);
        }
        [a, b] => {
            push_symbols(&mut out, u32::from(a) << 16 | u32::from(b) << 8, 3);
            out.push(PAD);
        }
        _ => {}
    }

    out
}

/// Append the first `count` 6-bit symbols of a 24-bit group
fn push_symbols(out: &mut String, group: u32, count: usize) {
    for i in 0..count {
        let shift = 18 - 6 * i;
        let index = (group >> shift) & 0x3f;
        out.push(char::from(ALPHABET[index as usize]));
    }
}
