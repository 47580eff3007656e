//! Long header encoding and parsing (RFC 9000 §17.2, §17.2.2).

use crate::error::Error;
use crate::varint::{decode_varint, put_varint, put_varint_with_len};

/// Every value written into a long header, in wire order.
///
/// The length prefixes are carried separately from the bytes they describe
/// so a caller can write a header whose prefixes disagree with its contents.
#[derive(Debug, Clone)]
pub struct LongHeaderLayout<'a> {
    pub first_byte: u8,
    pub version: u32,
    pub dcid_len: u8,
    pub dcid: &'a [u8],
    pub scid_len: u8,
    pub scid: &'a [u8],
    pub token_len: u64,
    pub token: &'a [u8],
    /// Value of the Length field (packet number + payload + tag).
    pub length: u64,
    /// Forced varint width for the Length field.
    pub length_width: Option<usize>,
}

/// Append the long header up to and including the Length field to `out`.
///
/// Returns the number of bytes written. The packet number follows directly.
pub fn encode_long_header(h: &LongHeaderLayout<'_>, out: &mut Vec<u8>) -> Result<usize, Error> {
    let start = out.len();

    out.push(h.first_byte);
    out.extend_from_slice(&h.version.to_be_bytes());

    out.push(h.dcid_len);
    out.extend_from_slice(h.dcid);

    out.push(h.scid_len);
    out.extend_from_slice(h.scid);

    put_varint(out, h.token_len)?;
    out.extend_from_slice(h.token);

    match h.length_width {
        Some(width) => put_varint_with_len(out, h.length, width)?,
        None => put_varint(out, h.length)?,
    };

    Ok(out.len() - start)
}

/// Parsed Initial-style long header (header protection still applied to the
/// first byte).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialHeader<'a> {
    pub first_byte: u8,
    pub version: u32,
    pub dcid: &'a [u8],
    pub scid: &'a [u8],
    pub token: &'a [u8],
    /// Value of the Length field (covering packet number + encrypted payload).
    pub length: u64,
    /// Offset into the original buffer where the packet number begins.
    pub pn_offset: usize,
}

fn take<'a>(buf: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8], Error> {
    let end = pos.saturating_add(n);
    let out = buf.get(*pos..end).ok_or(Error::TruncatedInput {
        needed: end,
        available: buf.len(),
    })?;
    *pos = end;
    Ok(out)
}

/// Parse a long header carrying a token, as built by this crate.
pub fn parse_initial_header(buf: &[u8]) -> Result<InitialHeader<'_>, Error> {
    let mut pos = 0;

    let first_byte = take(buf, &mut pos, 1)?[0];
    if first_byte & 0x80 == 0 {
        return Err(Error::NotLongHeader);
    }

    let version = take(buf, &mut pos, 4)?;
    let version = u32::from_be_bytes([version[0], version[1], version[2], version[3]]);

    let dcid_len = take(buf, &mut pos, 1)?[0] as usize;
    let dcid = take(buf, &mut pos, dcid_len)?;

    let scid_len = take(buf, &mut pos, 1)?[0] as usize;
    let scid = take(buf, &mut pos, scid_len)?;

    let (token_len, consumed) = decode_varint(&buf[pos..])?;
    pos += consumed;
    let token_len = usize::try_from(token_len).map_err(|_| Error::TruncatedInput {
        needed: usize::MAX,
        available: buf.len(),
    })?;
    let token = take(buf, &mut pos, token_len)?;

    let (length, consumed) = decode_varint(&buf[pos..])?;
    pos += consumed;

    Ok(InitialHeader {
        first_byte,
        version,
        dcid,
        scid,
        token,
        length,
        pn_offset: pos,
    })
}
