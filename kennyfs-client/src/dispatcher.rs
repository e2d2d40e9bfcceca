//! The network brick's client dispatcher (spec.md §4.D, "Client
//! dispatcher"): for each filesystem call, build a [`Request`], perform one
//! blocking round trip over a single `TcpStream`, and decode the reply. A
//! `std::sync::Mutex` around the stream is the "mutual-exclusion primitive"
//! spec.md §5 requires so that concurrent callers from a multi-threaded
//! upper layer never interleave a request/reply pair on the wire — at most
//! one outstanding request per connection at a time.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Mutex;

use kennyfs_core::backend::{Backend, DirEntry, OpenReply};
use kennyfs_core::context::Context;
use kennyfs_core::errno::{BackendResult, Errno, EREMOTEIO};
use kennyfs_core::handles::FileHandle;
use kennyfs_core::ops::{decode_reply, iter_dir_entries, Reply, Request};
use kennyfs_wire::frame::{decode_reply_header, encode_request_header, REPLY_HEADER_LEN};
use kennyfs_wire::{OpId, Stat, TimespecPair, SOP};

use crate::error::{DispatchError, Result};

/// A single TCP connection to a `kennyfs-server`, performing the handshake
/// once at [`Dispatcher::connect`] and then one serialized request/reply
/// round trip per call thereafter.
pub struct Dispatcher {
    stream: Mutex<TcpStream>,
    /// Mirrors the server's `max_body_len` (`BUF_CAP - 2`): a request this
    /// dispatcher builds that exceeds it would poison the connection on the
    /// server side before a reply is ever sent, so it is rejected locally
    /// instead (spec.md §3, Frame invariant).
    max_body_len: u32,
}

impl Dispatcher {
    /// Connects to `addr`, completes the SOP handshake (spec.md §6: "Both
    /// sides transmit, immediately after TCP establishment, a fixed
    /// start-of-protocol ASCII string"), and returns a dispatcher ready to
    /// serve filesystem calls. `buf_cap` must match the server's configured
    /// `BUF_CAP` for this connection; a mismatch cannot be detected from the
    /// wire and would only surface later as a spurious `BodyTooLarge`
    /// rejection or an oversized reply the server truncates.
    pub fn connect<A: ToSocketAddrs>(addr: A, buf_cap: u32) -> Result<Self> {
        let mut stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        let mut peer_sop = vec![0u8; SOP.len()];
        stream.read_exact(&mut peer_sop)?;
        if peer_sop != SOP {
            return Err(DispatchError::HandshakeMismatch);
        }
        stream.write_all(SOP)?;

        Ok(Self { stream: Mutex::new(stream), max_body_len: buf_cap.saturating_sub(2) })
    }

    /// Sends `quit` and drops the connection without waiting for a reply —
    /// spec.md's catalogue gives `quit` no reply body, only "(triggers
    /// disconnection)" on the server side.
    pub fn quit(&self) -> Result<()> {
        let mut req = Vec::with_capacity(kennyfs_wire::REQUEST_HEADER_LEN);
        encode_request_header(&mut req, OpId::Quit, 0);
        let mut stream = self.stream.lock().expect("dispatcher stream mutex poisoned");
        stream.write_all(&req)?;
        Ok(())
    }

    /// The round-trip primitive: encode `op`'s body, write the request
    /// frame, read the 8-byte reply header, read the body, and return the
    /// decoded return code alongside the raw reply body. Holds the mutex
    /// for the whole exchange, matching "only one outstanding request per
    /// connection at a time" (spec.md §5).
    fn round_trip(&self, op: OpId, body: &[u8]) -> Result<(i32, Vec<u8>)> {
        if body.len() as u32 > self.max_body_len {
            return Err(DispatchError::BodyTooLarge { len: body.len(), limit: self.max_body_len });
        }

        let mut request = Vec::with_capacity(kennyfs_wire::REQUEST_HEADER_LEN + body.len());
        encode_request_header(&mut request, op, body.len() as u32);
        request.extend_from_slice(body);

        let mut stream = self.stream.lock().expect("dispatcher stream mutex poisoned");
        stream.write_all(&request)?;

        let mut header_buf = [0u8; REPLY_HEADER_LEN];
        stream.read_exact(&mut header_buf)?;
        let header = decode_reply_header(&header_buf)?;

        let mut reply_body = vec![0u8; header.body_len as usize];
        stream.read_exact(&mut reply_body)?;

        Ok((header.return_code, reply_body))
    }

    /// Performs one filesystem operation end to end: encode `request`,
    /// round-trip it, and decode the reply against the op id `request`
    /// carries. Transport and decode failures both collapse to
    /// `EREMOTEIO` here — this is the boundary spec.md §7 describes as "the
    /// client dispatcher maps any transport-level failure into a single
    /// `EREMOTEIO` returned to the upper filesystem layer."
    fn call(&self, request: &Request) -> BackendResult<Reply> {
        let op = request.op();
        let body = request.encode_body();
        let (return_code, reply_body) = self.round_trip(op, &body).map_err(|_| EREMOTEIO)?;
        decode_reply(op, return_code, &reply_body)
    }
}

/// Unwraps a [`Reply`] variant the caller knows `op` always produces on
/// success. A mismatch here means the server and client disagree on the
/// catalogue — a programming error, not a runtime condition a caller can
/// recover from, so it surfaces as `EREMOTEIO` rather than a panic.
fn expect_stat(reply: Reply, op: OpId) -> BackendResult<Stat> {
    match reply {
        Reply::Stat(stat) => Ok(stat),
        _ => Err(mismatched_shape(op)),
    }
}

fn mismatched_shape(_op: OpId) -> Errno {
    EREMOTEIO
}

impl Backend for Dispatcher {
    /// The wire's own 8-byte directory handle. The dispatcher has no
    /// backend-side structure of its own to stash here — unlike the
    /// server, which owns a generation-guarded table, the client only ever
    /// forwards this handle back to the server verbatim.
    type DirHandle = [u8; 8];

    fn getattr(&self, _ctx: &Context, path: &str) -> BackendResult<Stat> {
        let reply = self.call(&Request::Getattr { path: path.to_string() })?;
        expect_stat(reply, OpId::Getattr)
    }

    fn readlink(&self, _ctx: &Context, path: &str) -> BackendResult<Vec<u8>> {
        match self.call(&Request::Readlink { path: path.to_string() })? {
            Reply::Bytes(target) => Ok(target),
            _ => Err(mismatched_shape(OpId::Readlink)),
        }
    }

    fn mknod(&self, _ctx: &Context, path: &str, mode: u32) -> BackendResult<()> {
        self.call(&Request::Mknod { mode, path: path.to_string() }).map(|_| ())
    }

    fn mkdir(&self, _ctx: &Context, path: &str, mode: u32) -> BackendResult<()> {
        self.call(&Request::Mkdir { mode, path: path.to_string() }).map(|_| ())
    }

    fn unlink(&self, _ctx: &Context, path: &str) -> BackendResult<()> {
        self.call(&Request::Unlink { path: path.to_string() }).map(|_| ())
    }

    fn rmdir(&self, _ctx: &Context, path: &str) -> BackendResult<()> {
        self.call(&Request::Rmdir { path: path.to_string() }).map(|_| ())
    }

    fn symlink(&self, _ctx: &Context, target: &str, linkpath: &str) -> BackendResult<()> {
        self.call(&Request::Symlink { target: target.to_string(), linkpath: linkpath.to_string() }).map(|_| ())
    }

    fn rename(&self, _ctx: &Context, from: &str, to: &str) -> BackendResult<()> {
        self.call(&Request::Rename { from: from.to_string(), to: to.to_string() }).map(|_| ())
    }

    fn link(&self, _ctx: &Context, oldpath: &str, newpath: &str) -> BackendResult<()> {
        self.call(&Request::Link { oldpath: oldpath.to_string(), newpath: newpath.to_string() }).map(|_| ())
    }

    fn chmod(&self, _ctx: &Context, path: &str, mode: u32) -> BackendResult<()> {
        self.call(&Request::Chmod { mode, path: path.to_string() }).map(|_| ())
    }

    fn chown(&self, _ctx: &Context, path: &str, uid: u32, gid: u32) -> BackendResult<()> {
        self.call(&Request::Chown { uid, gid, path: path.to_string() }).map(|_| ())
    }

    fn truncate(&self, _ctx: &Context, path: &str, size: u64) -> BackendResult<()> {
        self.call(&Request::Truncate { offset: size, path: path.to_string() }).map(|_| ())
    }

    fn open(&self, _ctx: &Context, path: &str, flags: u32) -> BackendResult<OpenReply> {
        match self.call(&Request::Open { flags, path: path.to_string() })? {
            Reply::Open { fh, flags_bitset } => Ok(OpenReply::from_wire(fh, flags_bitset)),
            _ => Err(mismatched_shape(OpId::Open)),
        }
    }

    fn create(&self, _ctx: &Context, path: &str, flags: u32, mode: u32) -> BackendResult<OpenReply> {
        match self.call(&Request::Create { flags, mode, path: path.to_string() })? {
            Reply::Open { fh, flags_bitset } => Ok(OpenReply::from_wire(fh, flags_bitset)),
            _ => Err(mismatched_shape(OpId::Create)),
        }
    }

    fn read(&self, _ctx: &Context, fh: FileHandle, offset: u64, len: u32) -> BackendResult<Vec<u8>> {
        match self.call(&Request::Read { fh, len, offset })? {
            Reply::Bytes(data) => Ok(data),
            _ => Err(mismatched_shape(OpId::Read)),
        }
    }

    /// `write`'s byte count travels in the return code, not the reply body
    /// (spec.md §4.D) — `call` already surfaces that as `Ok` with an empty
    /// `Reply::Unit`, so the actual count has to come from the raw return
    /// code via [`Dispatcher::round_trip`] directly rather than `call`.
    fn write(&self, _ctx: &Context, fh: FileHandle, offset: u64, data: &[u8]) -> BackendResult<u32> {
        let request = Request::Write { fh, offset, data: data.to_vec() };
        let body = request.encode_body();
        let (return_code, _reply_body) = self.round_trip(OpId::Write, &body).map_err(|_| EREMOTEIO)?;
        if return_code < 0 {
            return Err(-return_code);
        }
        Ok(return_code as u32)
    }

    fn flush(&self, _ctx: &Context, fh: FileHandle) -> BackendResult<()> {
        self.call(&Request::Flush { fh }).map(|_| ())
    }

    fn release(&self, _ctx: &Context, fh: FileHandle) -> BackendResult<()> {
        self.call(&Request::Release { fh }).map(|_| ())
    }

    fn fsync(&self, _ctx: &Context, fh: FileHandle, datasync: bool) -> BackendResult<()> {
        self.call(&Request::Fsync { fh, datasync }).map(|_| ())
    }

    fn opendir(&self, _ctx: &Context, path: &str) -> BackendResult<Self::DirHandle> {
        match self.call(&Request::Opendir { path: path.to_string() })? {
            Reply::DirHandle(dh) => Ok(dh),
            _ => Err(mismatched_shape(OpId::Opendir)),
        }
    }

    fn readdir(
        &self,
        _ctx: &Context,
        dh: &Self::DirHandle,
        offset: u64,
        filler: &mut dyn FnMut(DirEntry) -> bool,
    ) -> BackendResult<()> {
        let reply = self.call(&Request::Readdir { dh: *dh, offset })?;
        let Reply::Readdir(body) = reply else {
            return Err(mismatched_shape(OpId::Readdir));
        };
        for entry in iter_dir_entries(&body) {
            let (stat, next_offset, name) = entry?;
            if !filler(DirEntry { name, stat, next_offset }) {
                break;
            }
        }
        Ok(())
    }

    fn releasedir(&self, _ctx: &Context, dh: Self::DirHandle) -> BackendResult<()> {
        self.call(&Request::Releasedir { dh }).map(|_| ())
    }

    fn fgetattr(&self, _ctx: &Context, fh: FileHandle) -> BackendResult<Stat> {
        let reply = self.call(&Request::Fgetattr { fh })?;
        expect_stat(reply, OpId::Fgetattr)
    }

    fn utimens(&self, _ctx: &Context, path: &str, times: TimespecPair) -> BackendResult<()> {
        self.call(&Request::Utimens { times, path: path.to_string() }).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// A bare listener that performs just the handshake half of the
    /// protocol the server owns, letting these tests pin `Dispatcher`'s own
    /// behavior without pulling in `kennyfs-server` (that full round trip is
    /// covered by `tests/dispatcher_roundtrip.rs`).
    fn spawn_handshake_only_peer(reply_sop: &'static [u8]) -> u16 {
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = stream.write_all(reply_sop);
                let mut discard = [0u8; 64];
                let _ = stream.read(&mut discard);
            }
        });
        port
    }

    #[test]
    fn connect_fails_on_sop_mismatch() {
        let port = spawn_handshake_only_peer(b"NOT-THE-RIGHT-SOP.....");
        let err = Dispatcher::connect((std::net::Ipv4Addr::LOCALHOST, port), 65536).unwrap_err();
        assert!(matches!(err, DispatchError::HandshakeMismatch));
    }

    #[test]
    fn connect_succeeds_on_matching_sop() {
        let port = spawn_handshake_only_peer(SOP);
        let dispatcher = Dispatcher::connect((std::net::Ipv4Addr::LOCALHOST, port), 65536).unwrap();
        assert_eq!(dispatcher.max_body_len, 65534);
    }

    #[test]
    fn oversize_request_is_rejected_before_it_ever_touches_the_socket() {
        let port = spawn_handshake_only_peer(SOP);
        let dispatcher = Dispatcher::connect((std::net::Ipv4Addr::LOCALHOST, port), 16).unwrap();
        let err = dispatcher.round_trip(OpId::Getattr, &[0u8; 100]).unwrap_err();
        assert!(matches!(err, DispatchError::BodyTooLarge { len: 100, limit: 14 }));
    }
}
