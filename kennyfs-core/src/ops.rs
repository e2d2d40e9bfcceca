//! The operation catalogue (spec.md §4.D): request/reply body shapes shared
//! verbatim between the server's handlers and the client dispatcher, so the
//! two sides can never drift apart on what a given op id's bytes mean.

use crate::backend::{DirEntry, OpenReply};
use crate::errno::{Errno, EINVAL};
use crate::handles::FileHandle;
use kennyfs_wire::integers::{get_u32, get_u64, get_u8, put_u32, put_u64, put_u8};
use kennyfs_wire::{decode_dual_path, decode_stat, encode_dual_path, encode_stat};
use kennyfs_wire::{decode_timespec_pair, encode_timespec_pair, OpId, Stat, TimespecPair};

fn path_of(body: &[u8]) -> &str {
    std::str::from_utf8(body).unwrap_or("")
}

/// A decoded request argument, one variant per catalogued operation id.
/// `Quit` carries no payload; operations with no catalogued wire layout
/// (`statfs`, `setxattr`/`getxattr`/`listxattr`/`removexattr`, `fsyncdir`,
/// `access`, `ftruncate`, `lock`, `bmap`, `ioctl`, `poll`) are deliberately
/// absent here — see DESIGN.md for why those op ids are wired to `ENOSYS`
/// rather than given an invented layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Quit,
    Getattr { path: String },
    Readlink { path: String },
    Mknod { mode: u32, path: String },
    Mkdir { mode: u32, path: String },
    Unlink { path: String },
    Rmdir { path: String },
    Symlink { target: String, linkpath: String },
    Rename { from: String, to: String },
    Link { oldpath: String, newpath: String },
    Chmod { mode: u32, path: String },
    Chown { uid: u32, gid: u32, path: String },
    Truncate { offset: u64, path: String },
    Open { flags: u32, path: String },
    Create { flags: u32, mode: u32, path: String },
    Read { fh: FileHandle, len: u32, offset: u64 },
    Write { fh: FileHandle, offset: u64, data: Vec<u8> },
    Flush { fh: FileHandle },
    Release { fh: FileHandle },
    Fsync { fh: FileHandle, datasync: bool },
    Opendir { path: String },
    Readdir { dh: [u8; 8], offset: u64 },
    Releasedir { dh: [u8; 8] },
    Fgetattr { fh: FileHandle },
    Utimens { times: TimespecPair, path: String },
}

impl Request {
    pub fn op(&self) -> OpId {
        match self {
            Request::Quit => OpId::Quit,
            Request::Getattr { .. } => OpId::Getattr,
            Request::Readlink { .. } => OpId::Readlink,
            Request::Mknod { .. } => OpId::Mknod,
            Request::Mkdir { .. } => OpId::Mkdir,
            Request::Unlink { .. } => OpId::Unlink,
            Request::Rmdir { .. } => OpId::Rmdir,
            Request::Symlink { .. } => OpId::Symlink,
            Request::Rename { .. } => OpId::Rename,
            Request::Link { .. } => OpId::Link,
            Request::Chmod { .. } => OpId::Chmod,
            Request::Chown { .. } => OpId::Chown,
            Request::Truncate { .. } => OpId::Truncate,
            Request::Open { .. } => OpId::Open,
            Request::Create { .. } => OpId::Create,
            Request::Read { .. } => OpId::Read,
            Request::Write { .. } => OpId::Write,
            Request::Flush { .. } => OpId::Flush,
            Request::Release { .. } => OpId::Release,
            Request::Fsync { .. } => OpId::Fsync,
            Request::Opendir { .. } => OpId::Opendir,
            Request::Readdir { .. } => OpId::Readdir,
            Request::Releasedir { .. } => OpId::Releasedir,
            Request::Fgetattr { .. } => OpId::Fgetattr,
            Request::Utimens { .. } => OpId::Utimens,
        }
    }

    /// Encodes this request's body (the frame header is a separate concern,
    /// handled by the caller — the client dispatcher's round-trip
    /// primitive).
    pub fn encode_body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Request::Quit => {}
            Request::Getattr { path } | Request::Readlink { path } | Request::Unlink { path } | Request::Rmdir { path } | Request::Opendir { path } => {
                out.extend_from_slice(path.as_bytes());
            }
            Request::Mknod { mode, path } | Request::Mkdir { mode, path } | Request::Chmod { mode, path } => {
                put_u32(&mut out, *mode);
                out.extend_from_slice(path.as_bytes());
            }
            Request::Symlink { target, linkpath } => encode_dual_path(&mut out, target.as_bytes(), linkpath.as_bytes()),
            Request::Rename { from, to } => encode_dual_path(&mut out, from.as_bytes(), to.as_bytes()),
            Request::Link { oldpath, newpath } => encode_dual_path(&mut out, oldpath.as_bytes(), newpath.as_bytes()),
            Request::Chown { uid, gid, path } => {
                put_u32(&mut out, *uid);
                put_u32(&mut out, *gid);
                out.extend_from_slice(path.as_bytes());
            }
            Request::Truncate { offset, path } => {
                put_u64(&mut out, *offset);
                out.extend_from_slice(path.as_bytes());
            }
            Request::Open { flags, path } => {
                put_u32(&mut out, *flags);
                out.extend_from_slice(path.as_bytes());
            }
            Request::Create { flags, mode, path } => {
                put_u32(&mut out, *flags);
                put_u32(&mut out, *mode);
                out.extend_from_slice(path.as_bytes());
            }
            Request::Read { fh, len, offset } => {
                out.extend_from_slice(&fh.to_wire());
                put_u32(&mut out, *len);
                put_u64(&mut out, *offset);
            }
            Request::Write { fh, offset, data } => {
                out.extend_from_slice(&fh.to_wire());
                put_u64(&mut out, *offset);
                out.extend_from_slice(data);
            }
            Request::Flush { fh } | Request::Release { fh } | Request::Fgetattr { fh } => {
                out.extend_from_slice(&fh.to_wire());
            }
            Request::Fsync { fh, datasync } => {
                out.extend_from_slice(&fh.to_wire());
                put_u8(&mut out, *datasync as u8);
            }
            Request::Readdir { dh, offset } => {
                out.extend_from_slice(dh);
                put_u64(&mut out, *offset);
            }
            Request::Releasedir { dh } => out.extend_from_slice(dh),
            Request::Utimens { times, path } => {
                encode_timespec_pair(&mut out, times);
                out.extend_from_slice(path.as_bytes());
            }
        }
        out
    }
}

/// Decodes a request body for the given op id. Mismatched fixed-length
/// bodies (and malformed dual-path payloads) yield `EINVAL` — spec.md §4.D:
/// "Mismatch → reply with EINVAL."
pub fn decode_request(op: OpId, body: &[u8]) -> Result<Request, Errno> {
    let shape_err = || EINVAL;
    Ok(match op {
        OpId::Quit => Request::Quit,
        OpId::Getattr => Request::Getattr { path: path_of(body).to_string() },
        OpId::Readlink => Request::Readlink { path: path_of(body).to_string() },
        OpId::Unlink => Request::Unlink { path: path_of(body).to_string() },
        OpId::Rmdir => Request::Rmdir { path: path_of(body).to_string() },
        OpId::Opendir => Request::Opendir { path: path_of(body).to_string() },
        OpId::Mknod | OpId::Mkdir | OpId::Chmod => {
            if body.len() < 4 {
                return Err(shape_err());
            }
            let mode = get_u32(body, 0).map_err(|_| shape_err())?;
            let path = path_of(&body[4..]).to_string();
            match op {
                OpId::Mknod => Request::Mknod { mode, path },
                OpId::Mkdir => Request::Mkdir { mode, path },
                _ => Request::Chmod { mode, path },
            }
        }
        OpId::Symlink => {
            let (p1, p2) = decode_dual_path(body).map_err(|_| shape_err())?;
            Request::Symlink { target: path_of(p1).to_string(), linkpath: path_of(p2).to_string() }
        }
        OpId::Rename => {
            let (p1, p2) = decode_dual_path(body).map_err(|_| shape_err())?;
            Request::Rename { from: path_of(p1).to_string(), to: path_of(p2).to_string() }
        }
        OpId::Link => {
            let (p1, p2) = decode_dual_path(body).map_err(|_| shape_err())?;
            Request::Link { oldpath: path_of(p1).to_string(), newpath: path_of(p2).to_string() }
        }
        OpId::Chown => {
            if body.len() < 8 {
                return Err(shape_err());
            }
            Request::Chown {
                uid: get_u32(body, 0).map_err(|_| shape_err())?,
                gid: get_u32(body, 4).map_err(|_| shape_err())?,
                path: path_of(&body[8..]).to_string(),
            }
        }
        OpId::Truncate => {
            if body.len() < 8 {
                return Err(shape_err());
            }
            Request::Truncate {
                offset: get_u64(body, 0).map_err(|_| shape_err())?,
                path: path_of(&body[8..]).to_string(),
            }
        }
        OpId::Open => {
            if body.len() < 4 {
                return Err(shape_err());
            }
            Request::Open {
                flags: get_u32(body, 0).map_err(|_| shape_err())?,
                path: path_of(&body[4..]).to_string(),
            }
        }
        OpId::Create => {
            if body.len() < 8 {
                return Err(shape_err());
            }
            Request::Create {
                flags: get_u32(body, 0).map_err(|_| shape_err())?,
                mode: get_u32(body, 4).map_err(|_| shape_err())?,
                path: path_of(&body[8..]).to_string(),
            }
        }
        OpId::Read => {
            if body.len() != 20 {
                return Err(shape_err());
            }
            Request::Read {
                fh: FileHandle::from_wire(&body[0..8]),
                len: get_u32(body, 8).map_err(|_| shape_err())?,
                offset: get_u64(body, 12).map_err(|_| shape_err())?,
            }
        }
        OpId::Write => {
            if body.len() < 16 {
                return Err(shape_err());
            }
            Request::Write {
                fh: FileHandle::from_wire(&body[0..8]),
                offset: get_u64(body, 8).map_err(|_| shape_err())?,
                data: body[16..].to_vec(),
            }
        }
        OpId::Flush => {
            if body.len() != 8 {
                return Err(shape_err());
            }
            Request::Flush { fh: FileHandle::from_wire(body) }
        }
        OpId::Release => {
            if body.len() != 8 {
                return Err(shape_err());
            }
            Request::Release { fh: FileHandle::from_wire(body) }
        }
        OpId::Fgetattr => {
            if body.len() != 8 {
                return Err(shape_err());
            }
            Request::Fgetattr { fh: FileHandle::from_wire(body) }
        }
        OpId::Fsync => {
            if body.len() != 9 {
                return Err(shape_err());
            }
            Request::Fsync { fh: FileHandle::from_wire(&body[0..8]), datasync: get_u8(body, 8).map_err(|_| shape_err())? != 0 }
        }
        OpId::Readdir => {
            if body.len() != 16 {
                return Err(shape_err());
            }
            let mut dh = [0u8; 8];
            dh.copy_from_slice(&body[0..8]);
            Request::Readdir { dh, offset: get_u64(body, 8).map_err(|_| shape_err())? }
        }
        OpId::Releasedir => {
            if body.len() != 8 {
                return Err(shape_err());
            }
            let mut dh = [0u8; 8];
            dh.copy_from_slice(body);
            Request::Releasedir { dh }
        }
        OpId::Utimens => {
            if body.len() < 32 {
                return Err(shape_err());
            }
            Request::Utimens {
                times: decode_timespec_pair(body, 0).map_err(|_| shape_err())?,
                path: path_of(&body[32..]).to_string(),
            }
        }
        _ => return Err(crate::errno::ENOSYS),
    })
}

/// A decoded reply payload, one variant per distinct body shape the
/// catalogue uses. `Unit` covers every operation whose success reply body
/// is empty, including `write` (whose byte count travels in the return
/// code, not the body).
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Unit,
    Stat(Stat),
    Bytes(Vec<u8>),
    Open { fh: FileHandle, flags_bitset: u8 },
    DirHandle([u8; 8]),
    /// Raw concatenated directory entries; use [`iter_dir_entries`] to walk
    /// them.
    Readdir(Vec<u8>),
}

pub fn encode_reply_stat(stat: &Stat) -> Vec<u8> {
    let mut out = Vec::new();
    encode_stat(&mut out, stat);
    out
}

pub fn encode_reply_open(open: &OpenReply) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    out.extend_from_slice(&open.fh.to_wire());
    out.push(open.flags_bitset());
    out
}

/// Serializes one directory entry: `13×u32 stat | u64 offset | u32 name_len
/// | name | 0x00`.
pub fn encode_dir_entry(out: &mut Vec<u8>, entry: &DirEntry) {
    encode_stat(out, &entry.stat);
    put_u64(out, entry.next_offset);
    put_u32(out, entry.name.len() as u32);
    out.extend_from_slice(&entry.name);
    out.push(0);
}

/// Walks a `readdir` reply body, yielding `(Stat, next_offset, name)` per
/// entry. Used by both the client dispatcher (to hand entries back to its
/// caller) and tests asserting what the server produced.
pub fn iter_dir_entries(buf: &[u8]) -> impl Iterator<Item = Result<(Stat, u64, Vec<u8>), Errno>> + '_ {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos >= buf.len() {
            return None;
        }
        Some((|| {
            let stat = decode_stat(buf, pos).map_err(|_| EINVAL)?;
            pos += kennyfs_wire::STAT_WIRE_LEN;
            let offset = get_u64(buf, pos).map_err(|_| EINVAL)?;
            pos += 8;
            let name_len = get_u32(buf, pos).map_err(|_| EINVAL)? as usize;
            pos += 4;
            let name = buf.get(pos..pos + name_len).ok_or(EINVAL)?.to_vec();
            pos += name_len;
            if buf.get(pos).copied() != Some(0) {
                return Err(EINVAL);
            }
            pos += 1;
            Ok((stat, offset, name))
        })())
    })
}

/// Decodes a reply's body given the op id it answers and the already
/// decoded return code. A negative return code means the body is empty and
/// this returns `Err(errno)` directly; callers never need to branch twice.
pub fn decode_reply(op: OpId, return_code: i32, body: &[u8]) -> Result<Reply, Errno> {
    if return_code < 0 {
        return Err(-return_code);
    }
    Ok(match op {
        OpId::Getattr | OpId::Fgetattr => Reply::Stat(decode_stat(body, 0).map_err(|_| EINVAL)?),
        OpId::Readlink => Reply::Bytes(body.to_vec()),
        OpId::Open | OpId::Create => {
            if body.len() != 9 {
                return Err(EINVAL);
            }
            Reply::Open { fh: FileHandle::from_wire(&body[0..8]), flags_bitset: body[8] }
        }
        OpId::Read => Reply::Bytes(body.to_vec()),
        OpId::Opendir => {
            if body.len() != 8 {
                return Err(EINVAL);
            }
            let mut dh = [0u8; 8];
            dh.copy_from_slice(body);
            Reply::DirHandle(dh)
        }
        OpId::Readdir => Reply::Readdir(body.to_vec()),
        _ => Reply::Unit,
    })
}
