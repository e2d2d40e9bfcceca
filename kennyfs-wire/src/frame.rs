use crate::error::WireError;
use crate::integers::{get_u16, get_u32, put_u16, put_u32};
use crate::opcode::OpId;

/// Start-of-protocol handshake string, sent by both sides immediately after
/// TCP establishment. Implementation-defined but must never change once
/// shipped — a client and server disagreeing on this string cannot complete
/// a handshake.
pub const SOP: &[u8] = b"KENNYFS-NET-1\n";

/// Request frame header: `u32 body_len | u16 op_id`, 6 bytes total.
pub const REQUEST_HEADER_LEN: usize = 6;

pub fn encode_request_header(out: &mut Vec<u8>, op: OpId, body_len: u32) {
    put_u32(out, body_len);
    put_u16(out, op.as_u16());
}

pub struct RequestHeader {
    pub body_len: u32,
    pub op: OpId,
}

pub fn decode_request_header(buf: &[u8]) -> Result<RequestHeader, WireError> {
    let body_len = get_u32(buf, 0)?;
    let op_raw = get_u16(buf, 4)?;
    let op = OpId::try_from_u16(op_raw)?;
    Ok(RequestHeader { body_len, op })
}

/// Reply header: `u32 (return_code + 2^31) | u32 body_len`, 8 bytes total.
/// The offset-binary bias lets the wire carry negative errnos in an
/// unsigned field without a sign bit of its own.
pub const REPLY_HEADER_LEN: usize = 8;
const RETURN_CODE_BIAS: i64 = 1 << 31;

/// Encodes a backend return code (0 or a positive byte count on success,
/// negative errno on failure) into its biased wire representation. The
/// input is `i64` rather than `i32` deliberately: the protocol assumes a
/// 32-bit return value (spec.md Design Notes, "Open question — return-code
/// encoding"), and this signature is where that assumption gets checked.
/// Returns `None` if the value does not fit the biased 32-bit field; callers
/// must treat that as `EREMOTEIO` rather than truncate silently.
pub fn encode_return_code(code: i64) -> Option<u32> {
    let biased = code + RETURN_CODE_BIAS;
    u32::try_from(biased).ok()
}

pub fn decode_return_code(wire: u32) -> i32 {
    (wire as i64 - RETURN_CODE_BIAS) as i32
}

pub fn encode_reply_header(out: &mut Vec<u8>, return_code: i64, body_len: u32) {
    let biased = encode_return_code(return_code).unwrap_or_else(|| {
        encode_return_code(-i64::from(crate::errno::EREMOTEIO))
            .expect("-EREMOTEIO fits the biased field")
    });
    put_u32(out, biased);
    put_u32(out, body_len);
}

pub struct ReplyHeader {
    pub return_code: i32,
    pub body_len: u32,
}

pub fn decode_reply_header(buf: &[u8]) -> Result<ReplyHeader, WireError> {
    let biased = get_u32(buf, 0)?;
    let body_len = get_u32(buf, 4)?;
    Ok(ReplyHeader { return_code: decode_return_code(biased), body_len })
}
