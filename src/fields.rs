//! Parsers for the textual field values accepted on the command line.
//!
//! Strings are turned into typed values here, once; nothing past this module
//! handles text.

use crate::crypto::SampleSource;
use crate::error::Error;

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse a hex byte string, with or without a `0x` prefix. Empty is allowed.
pub fn parse_hex(field: &'static str, s: &str) -> Result<Vec<u8>, Error> {
    hex::decode(strip_hex_prefix(s.trim())).map_err(|_| Error::MalformedHex { field })
}

/// Parse a bit string of exactly `width` characters, e.g. `"01"`.
pub fn parse_bits(field: &'static str, s: &str, width: usize) -> Result<u8, Error> {
    if s.len() != width {
        return Err(Error::InvalidFieldWidth {
            field,
            expected: width,
            actual: s.len(),
        });
    }
    s.bytes().try_fold(0u8, |acc, c| match c {
        b'0' => Ok(acc << 1),
        b'1' => Ok((acc << 1) | 1),
        _ => Err(Error::MalformedBits { field }),
    })
}

/// Parse a single bit given as `0` or `1`.
pub fn parse_bit(field: &'static str, value: u8) -> Result<u8, Error> {
    if value > 1 {
        return Err(Error::InvalidFieldWidth {
            field,
            expected: 1,
            actual: 8 - value.leading_zeros() as usize,
        });
    }
    Ok(value)
}

/// Parse a version as up to 8 hex digits, e.g. `00000001` or `0xff00001d`.
pub fn parse_version(field: &'static str, s: &str) -> Result<u32, Error> {
    let digits = strip_hex_prefix(s.trim());
    if digits.is_empty() {
        return Err(Error::MalformedHex { field });
    }
    if digits.len() > 8 {
        return Err(Error::InvalidFieldWidth {
            field,
            expected: 8,
            actual: digits.len(),
        });
    }
    u32::from_str_radix(digits, 16).map_err(|_| Error::MalformedHex { field })
}

/// Parse a sample override: `0x`-prefixed hex for raw bytes, or a decimal
/// offset from the start of the packet number field.
pub fn parse_sample(s: &str) -> Result<SampleSource, Error> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        return Ok(SampleSource::Raw(parse_hex("sample", s)?));
    }
    s.parse::<usize>()
        .map(SampleSource::Offset)
        .map_err(|_| Error::MalformedHex { field: "sample" })
}
