use encoding_rs::WINDOWS_1252;
use nom::combinator::{flat_map, map, verify};
use nom::{bytes, number, IResult, Parser};

/// Parse signed byte
pub fn parse_i8(i: &[u8]) -> IResult<&[u8], i8> {
    number::complete::le_i8(i)
}

/// Parse unsigned byte
pub fn parse_u8(i: &[u8]) -> IResult<&[u8], u8> {
    number::complete::le_u8(i)
}

/// Parse signed 32
pub fn parse_int(i: &[u8]) -> IResult<&[u8], i32> {
    number::complete::le_i32(i)
}

/// Parse signed 32 holding a count, negative values are rejected
pub fn parse_count(i: &[u8]) -> IResult<&[u8], usize> {
    map(verify(parse_int, |value: &i32| *value >= 0), |value| {
        value as usize
    })
    .parse(i)
}

/// Parse signed short
pub fn parse_short(i: &[u8]) -> IResult<&[u8], i16> {
    number::complete::le_i16(i)
}

/// Parse RGB color followed by a blank byte
pub fn parse_color(i: &[u8]) -> IResult<&[u8], i32> {
    map(
        (parse_u8, parse_u8, parse_u8, parse_u8),
        |(r, g, b, _ignore)| (r as i32) << 16 | (g as i32) << 8 | b as i32,
    )
    .parse(i)
}

/// Skip `n` bytes, failing when fewer are left.
pub fn skip(n: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> {
    move |i: &[u8]| {
        log::debug!("skip: {n}");
        map(bytes::complete::take(n), |_| ()).parse(i)
    }
}

/// Materialize properly encoded String
fn make_string(i: &[u8]) -> String {
    let (cow, encoding_used, had_errors) = WINDOWS_1252.decode(i);
    if had_errors {
        log::debug!("Error parsing string with {encoding_used:?}");
        match std::str::from_utf8(i) {
            Ok(s) => s.to_string(),
            Err(e) => {
                log::debug!("Error UTF-8 string parsing:{e}");
                String::new()
            }
        }
    } else {
        cow.into_owned()
    }
}

/// Parse string field of length `string_len` with total size to consume `field_size`
fn parse_string_field(
    field_size: usize,
    string_len: usize,
) -> impl FnMut(&[u8]) -> IResult<&[u8], String> {
    move |i: &[u8]| {
        map(bytes::complete::take(field_size), |field: &[u8]| {
            make_string(&field[..string_len.min(field_size)])
        })
        .parse(i)
    }
}

/// Size of string encoded as Int.
/// [i32 string_len][string bytes]
pub fn parse_int_sized_string(i: &[u8]) -> IResult<&[u8], String> {
    flat_map(parse_count, |len| parse_string_field(len, len)).parse(i)
}

/// Size of Strings provided
/// [u8 string_len][field of `size` bytes]
pub fn parse_byte_size_string(size: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], String> {
    move |i: &[u8]| {
        let (i, length) = parse_u8(i)?;
        parse_string_field(size, length as usize)(i)
    }
}

/// Size of string encoded as Int, but the size is encoded as a byte.
/// [i32 string_len + 1][u8 string_len][string bytes]
pub fn parse_int_byte_sized_string(i: &[u8]) -> IResult<&[u8], String> {
    flat_map(verify(parse_int, |len: &i32| *len >= 1), |len| {
        flat_map(parse_u8, move |str_len| {
            parse_string_field(len as usize - 1, str_len as usize)
        })
    })
    .parse(i)
}
