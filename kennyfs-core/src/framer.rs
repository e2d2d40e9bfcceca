//! RX framing: a coroutine-free state machine extracting complete request
//! frames from a connection's RX ring. See spec.md §4.B.

use crate::ring::{Ring, RingError};
use kennyfs_wire::{integers::get_u16, OpId, SOP};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("start-of-protocol mismatch: connection is poisoned")]
    BadSop,
    #[error("announced body length {len} exceeds the per-connection limit of {limit}")]
    BodyTooLarge { len: u32, limit: u32 },
    #[error("unknown operation id {0}")]
    UnknownOp(u16),
}

/// A decoded request ready for dispatch: the operation id and its raw body
/// bytes (the op-id's 2 bytes already stripped off by the framer).
pub struct RawRequest {
    pub op: OpId,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitSop,
    AwaitHeader,
    AwaitBody { body_len: u32 },
}

/// Per-connection framing state. Lives alongside the RX ring it drains;
/// holding it separately (rather than on `Ring` itself) keeps `Ring` a pure
/// byte-buffer with no protocol awareness, matching spec.md's separation of
/// "ring buffers" (§4.B) as a distinct concern from "framing" (also §4.B,
/// but logically layered on top).
pub struct Framer {
    state: State,
}

impl Framer {
    pub fn new() -> Self {
        Self { state: State::AwaitSop }
    }

    /// Attempts to extract one complete frame from `rx`. Returns `Ok(None)`
    /// when fewer bytes than the current state needs are buffered — the
    /// caller should stop and wait for the next readable event. Returns
    /// `Err` when the connection must be poisoned (closed without a reply).
    ///
    /// Call in a loop ("re-enter to drain remaining buffered bytes") until
    /// it returns `Ok(None)` or `Err`.
    pub fn try_next(&mut self, rx: &mut Ring, max_body_len: u32) -> Result<Option<RawRequest>, FramingError> {
        loop {
            match self.state {
                State::AwaitSop => {
                    if rx.used() < SOP.len() {
                        return Ok(None);
                    }
                    let got = extract_exact(rx, SOP.len());
                    if got != SOP {
                        return Err(FramingError::BadSop);
                    }
                    self.state = State::AwaitHeader;
                }
                State::AwaitHeader => {
                    if rx.used() < 4 {
                        return Ok(None);
                    }
                    let hdr = extract_exact(rx, 4);
                    let body_len = u32::from_be_bytes(hdr.try_into().expect("4 bytes"));
                    if body_len > max_body_len {
                        return Err(FramingError::BodyTooLarge { len: body_len, limit: max_body_len });
                    }
                    self.state = State::AwaitBody { body_len };
                }
                State::AwaitBody { body_len } => {
                    let need = body_len as usize + 2;
                    if rx.used() < need {
                        return Ok(None);
                    }
                    let chunk = extract_exact(rx, need);
                    let op_raw = get_u16(&chunk, 0).expect("checked length");
                    let op = OpId::try_from_u16(op_raw).map_err(|_| FramingError::UnknownOp(op_raw))?;
                    let body = chunk[2..2 + body_len as usize].to_vec();
                    self.state = State::AwaitHeader;
                    return Ok(Some(RawRequest { op, body }));
                }
            }
        }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

/// `rx.extract` always succeeds here because every call site checks
/// `rx.used()` against the exact byte count first; `RingError::NotEnough`
/// would indicate a bug in that pre-check, not a recoverable protocol state.
fn extract_exact(rx: &mut Ring, n: usize) -> Vec<u8> {
    match rx.extract(n) {
        Ok(mut v) => {
            v.truncate(n);
            v
        }
        Err(RingError::NotEnough { .. }) => unreachable!("caller already checked rx.used() >= n"),
        Err(e) => unreachable!("extract() cannot fail this way: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennyfs_wire::frame::encode_request_header;

    fn build_frame(op: OpId, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&op.as_u16().to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn whole_frame_at_once() {
        let mut rx = Ring::new(1024);
        rx.write(SOP).unwrap();
        rx.write(&build_frame(OpId::Getattr, b"/")).unwrap();
        let mut framer = Framer::new();
        let req = framer.try_next(&mut rx, 1022).unwrap().unwrap();
        assert_eq!(req.op, OpId::Getattr);
        assert_eq!(req.body, b"/");
        assert!(framer.try_next(&mut rx, 1022).unwrap().is_none());
    }

    #[test]
    fn one_byte_at_a_time_matches_whole_frame() {
        let mut whole = Vec::new();
        whole.extend_from_slice(SOP);
        whole.extend_from_slice(&build_frame(OpId::Getattr, b"/etc/passwd"));

        let mut rx = Ring::new(1024);
        let mut framer = Framer::new();
        let mut got = None;
        for byte in &whole {
            rx.write(std::slice::from_ref(byte)).unwrap();
            if let Some(req) = framer.try_next(&mut rx, 1022).unwrap() {
                got = Some(req);
            }
        }
        let req = got.expect("frame was eventually assembled");
        assert_eq!(req.op, OpId::Getattr);
        assert_eq!(req.body, b"/etc/passwd");
    }

    #[test]
    fn bad_sop_poisons_connection() {
        let mut rx = Ring::new(64);
        rx.write(b"NOT-THE-SOP...").unwrap();
        let mut framer = Framer::new();
        assert_eq!(framer.try_next(&mut rx, 62).unwrap_err(), FramingError::BadSop);
    }

    #[test]
    fn oversize_body_is_poison() {
        let mut rx = Ring::new(1024);
        rx.write(SOP).unwrap();
        let mut buf = Vec::new();
        encode_request_header(&mut buf, OpId::Read, 2000);
        // Drop the op id half of the header wire layout lives in the body chunk;
        // the framer only needs the 4-byte length here.
        rx.write(&buf[..4]).unwrap();
        let mut framer = Framer::new();
        assert_eq!(
            framer.try_next(&mut rx, 1022).unwrap_err(),
            FramingError::BodyTooLarge { len: 2000, limit: 1022 }
        );
    }
}
