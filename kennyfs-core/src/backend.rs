//! The backend-operations interface (spec.md §6, "Backend operations
//! interface"): the set of synchronous calls the server dispatches to and
//! the client dispatcher emulates. Out of scope per spec.md §1 is any
//! concrete implementation (local POSIX, cache, mirror, ...) — this module
//! only specifies the trait. `kennyfs-backend-memory` is a minimal
//! in-memory stand-in used to make the server and its tests runnable.

use crate::context::Context;
use crate::errno::{BackendResult, ENOSYS};
use crate::handles::FileHandle;
use kennyfs_wire::{Stat, TimespecPair};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenReply {
    pub fh: FileHandle,
    pub direct_io: bool,
    pub keep_cache: bool,
    pub non_seekable: bool,
}

impl OpenReply {
    pub fn flags_bitset(&self) -> u8 {
        (self.direct_io as u8) | ((self.keep_cache as u8) << 1) | ((self.non_seekable as u8) << 2)
    }

    pub fn from_wire(fh: FileHandle, bits: u8) -> Self {
        Self {
            fh,
            direct_io: bits & 0b001 != 0,
            keep_cache: bits & 0b010 != 0,
            non_seekable: bits & 0b100 != 0,
        }
    }
}

/// One entry the directory-read handler accumulates into the readdir
/// reply body: `13×u32 stat | u64 offset | u32 name_len | name | 0x00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: Vec<u8>,
    pub stat: Stat,
    /// The offset a subsequent `readdir` call should resume from if this is
    /// the last entry accepted this round.
    pub next_offset: u64,
}

/// Every backend operation returns `Ok` on success or `Err(errno)` — a
/// positive POSIX errno magnitude — on failure. The default implementation
/// of every method is `Err(ENOSYS)`, so a `Backend` only needs to override
/// the operations it actually supports; the server is required to tolerate
/// any of them being absent (spec.md §6).
pub trait Backend: Send + Sync {
    /// The backend's own representation of an open directory, handed back
    /// opaquely by `opendir` and consumed by `readdir`/`releasedir`. Stored
    /// inside a [`crate::handles::DirHandleTable`] by the server, which
    /// synthesizes the wire-visible 8-byte directory handle around it.
    type DirHandle: Send + 'static;

    fn getattr(&self, _ctx: &Context, _path: &str) -> BackendResult<Stat> {
        Err(ENOSYS)
    }

    fn readlink(&self, _ctx: &Context, _path: &str) -> BackendResult<Vec<u8>> {
        Err(ENOSYS)
    }

    fn mknod(&self, _ctx: &Context, _path: &str, _mode: u32) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn mkdir(&self, _ctx: &Context, _path: &str, _mode: u32) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn unlink(&self, _ctx: &Context, _path: &str) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn rmdir(&self, _ctx: &Context, _path: &str) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn symlink(&self, _ctx: &Context, _target: &str, _linkpath: &str) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn rename(&self, _ctx: &Context, _from: &str, _to: &str) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn link(&self, _ctx: &Context, _oldpath: &str, _newpath: &str) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn chmod(&self, _ctx: &Context, _path: &str, _mode: u32) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn chown(&self, _ctx: &Context, _path: &str, _uid: u32, _gid: u32) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn truncate(&self, _ctx: &Context, _path: &str, _size: u64) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn open(&self, _ctx: &Context, _path: &str, _flags: u32) -> BackendResult<OpenReply> {
        Err(ENOSYS)
    }

    fn create(&self, _ctx: &Context, _path: &str, _flags: u32, _mode: u32) -> BackendResult<OpenReply> {
        Err(ENOSYS)
    }

    fn read(&self, _ctx: &Context, _fh: FileHandle, _offset: u64, _len: u32) -> BackendResult<Vec<u8>> {
        Err(ENOSYS)
    }

    fn write(&self, _ctx: &Context, _fh: FileHandle, _offset: u64, _data: &[u8]) -> BackendResult<u32> {
        Err(ENOSYS)
    }

    fn flush(&self, _ctx: &Context, _fh: FileHandle) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn release(&self, _ctx: &Context, _fh: FileHandle) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn fsync(&self, _ctx: &Context, _fh: FileHandle, _datasync: bool) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn opendir(&self, _ctx: &Context, _path: &str) -> BackendResult<Self::DirHandle> {
        Err(ENOSYS)
    }

    /// Invokes `filler` once per directory entry starting from `offset`,
    /// stopping either when the directory is exhausted or `filler` returns
    /// `false` (its accumulating buffer is full — "readdir returns with
    /// what it has", spec.md §4.D).
    fn readdir(
        &self,
        _ctx: &Context,
        _dh: &Self::DirHandle,
        _offset: u64,
        _filler: &mut dyn FnMut(DirEntry) -> bool,
    ) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn releasedir(&self, _ctx: &Context, _dh: Self::DirHandle) -> BackendResult<()> {
        Err(ENOSYS)
    }

    fn fgetattr(&self, _ctx: &Context, _fh: FileHandle) -> BackendResult<Stat> {
        Err(ENOSYS)
    }

    fn utimens(&self, _ctx: &Context, _path: &str, _times: TimespecPair) -> BackendResult<()> {
        Err(ENOSYS)
    }
}
