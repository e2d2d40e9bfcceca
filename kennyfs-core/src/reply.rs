//! Reply encoding: handlers write their body starting at byte offset 8 of a
//! scratch buffer; [`stamp_header`] then fills in the 8-byte header in
//! front. See spec.md §4.D.

use kennyfs_wire::frame::encode_reply_header;

pub const REPLY_HEADER_LEN: usize = kennyfs_wire::frame::REPLY_HEADER_LEN;

/// A fresh reply scratch buffer with the header's 8 bytes reserved (zeroed)
/// at the front. Handlers push their body bytes onto this directly.
pub fn new_reply_buf() -> Vec<u8> {
    vec![0u8; REPLY_HEADER_LEN]
}

/// Stamps the 8-byte reply header into `buf[0..8]` in place, given the
/// final body length implied by `buf.len() - 8`. Consumes `return_code` as
/// `i64` so a byte count (e.g. `write`'s bytes-written result) can be
/// passed directly without an intermediate cast that might silently
/// truncate it.
pub fn stamp_header(buf: &mut Vec<u8>, return_code: i64) {
    let body_len = (buf.len() - REPLY_HEADER_LEN) as u32;
    let mut header = Vec::with_capacity(REPLY_HEADER_LEN);
    encode_reply_header(&mut header, return_code, body_len);
    buf[..REPLY_HEADER_LEN].copy_from_slice(&header);
}
