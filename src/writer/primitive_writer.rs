use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;

/// Write unsigned byte
pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write signed byte
pub fn write_i8(out: &mut Vec<u8>, value: i8) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write signed short
pub fn write_short(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write signed 32
pub fn write_int(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write `n` zero bytes.
pub fn write_placeholder(out: &mut Vec<u8>, n: usize) {
    out.resize(out.len() + n, 0);
}

/// Write RGB color followed by a blank byte
pub fn write_color(out: &mut Vec<u8>, color: i32) {
    let [_, r, g, b] = color.to_be_bytes();
    out.extend_from_slice(&[r, g, b, 0]);
}

/// Encode string, characters outside Windows-1252 become numeric character references.
fn encode_string(value: &str) -> Cow<'_, [u8]> {
    let (bytes, _encoding_used, had_errors) = WINDOWS_1252.encode(value);
    if had_errors {
        log::debug!("String '{value}' is not fully representable in Windows-1252");
    }
    bytes
}

/// String bytes cut to what a one byte length prefix can announce.
fn encode_capped(value: &str, cap: usize) -> Cow<'_, [u8]> {
    match encode_string(value) {
        Cow::Borrowed(bytes) => Cow::Borrowed(&bytes[..bytes.len().min(cap)]),
        Cow::Owned(mut bytes) => {
            bytes.truncate(cap);
            Cow::Owned(bytes)
        }
    }
}

/// Size of Strings provided
/// [u8 string_len][field of `size` bytes, zero padded]
pub fn write_byte_size_string(out: &mut Vec<u8>, value: &str, size: usize) {
    let bytes = encode_capped(value, size.min(u8::MAX as usize));
    write_u8(out, bytes.len() as u8);
    out.extend_from_slice(&bytes);
    write_placeholder(out, size - bytes.len());
}

/// Size of string encoded as Int.
/// [i32 string_len][string bytes]
pub fn write_int_sized_string(out: &mut Vec<u8>, value: &str) {
    let bytes = encode_string(value);
    write_int(out, bytes.len() as i32);
    out.extend_from_slice(&bytes);
}

/// Size of string encoded as Int, followed by the size encoded as a byte.
/// [i32 string_len + 1][u8 string_len][string bytes]
pub fn write_int_byte_sized_string(out: &mut Vec<u8>, value: &str) {
    let bytes = encode_capped(value, u8::MAX as usize);
    write_int(out, bytes.len() as i32 + 1);
    write_u8(out, bytes.len() as u8);
    out.extend_from_slice(&bytes);
}
