//! The per-client `Connection` record: two byte rings, the RX framer, and
//! the directory-handle table. This module holds no socket and performs no
//! I/O — `kennyfs-server` owns the socket and drives this type from its
//! event loop.

use crate::framer::Framer;
use crate::handles::DirHandleTable;
use crate::ring::Ring;

/// Minimum ring capacity: enough for the SOP handshake plus one empty-body
/// request header, the smallest frame the protocol can carry.
pub fn min_buf_cap() -> usize {
    kennyfs_wire::SOP.len().max(kennyfs_wire::REQUEST_HEADER_LEN) + kennyfs_wire::REQUEST_HEADER_LEN
}

pub struct Connection<D> {
    pub rx: Ring,
    pub tx: Ring,
    pub framer: Framer,
    pub dirs: DirHandleTable<D>,
    buf_cap: u32,
}

impl<D> Connection<D> {
    pub fn new(buf_cap: usize) -> Self {
        assert!(buf_cap >= min_buf_cap(), "buf_cap too small to carry a single empty request");
        Self {
            rx: Ring::new(buf_cap),
            tx: Ring::new(buf_cap),
            framer: Framer::new(),
            dirs: DirHandleTable::new(),
            buf_cap: buf_cap as u32,
        }
    }

    /// The body-length ceiling the framer enforces: `BUF_CAP - 2`, leaving
    /// room for the 2-byte op id the framer extracts together with the body
    /// (see spec.md §3, Frame invariant).
    pub fn max_body_len(&self) -> u32 {
        self.buf_cap.saturating_sub(2)
    }

    pub fn buf_cap(&self) -> usize {
        self.buf_cap as usize
    }
}
