use crate::error::WireError;
use crate::integers::{get_u32, put_u32};

/// On-wire stat encoding: 13 big-endian `u32` fields. This is lossy by
/// design — `size`, `ino`, `blocks`, and the time fields are truncated from
/// their native 64-bit representation. That is a documented compatibility
/// wart of the v1 wire format (see spec.md Design Notes), not a bug; a v2
/// framing that widens these fields would need its own op-id range.
pub const STAT_WIRE_LEN: usize = 13 * 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: u64,
    pub blksize: u32,
    pub blocks: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
}

pub fn encode_stat(out: &mut Vec<u8>, stat: &Stat) {
    put_u32(out, stat.dev as u32);
    put_u32(out, stat.ino as u32);
    put_u32(out, stat.mode);
    put_u32(out, stat.nlink);
    put_u32(out, stat.uid);
    put_u32(out, stat.gid);
    put_u32(out, stat.rdev as u32);
    put_u32(out, stat.size as u32);
    put_u32(out, stat.blksize);
    put_u32(out, stat.blocks as u32);
    put_u32(out, stat.atime as u32);
    put_u32(out, stat.mtime as u32);
    put_u32(out, stat.ctime as u32);
}

pub fn decode_stat(buf: &[u8], off: usize) -> Result<Stat, WireError> {
    if buf.len() < off + STAT_WIRE_LEN {
        return Err(WireError::Truncated { need: off + STAT_WIRE_LEN, have: buf.len() });
    }
    let mut cur = off;
    let mut next = || -> Result<u32, WireError> {
        let v = get_u32(buf, cur)?;
        cur += 4;
        Ok(v)
    };
    Ok(Stat {
        dev: next()? as u64,
        ino: next()? as u64,
        mode: next()?,
        nlink: next()?,
        uid: next()?,
        gid: next()?,
        rdev: next()? as u64,
        size: next()? as u64,
        blksize: next()?,
        blocks: next()? as u64,
        atime: next()? as u64,
        mtime: next()? as u64,
        ctime: next()? as u64,
    })
}

/// Two-timespec serialization: `atime.sec, atime.nsec, mtime.sec, mtime.nsec`,
/// four big-endian `u64` fields (used by `utimens`). Unlike [`Stat`] these
/// are full 64-bit, since `utimens` is the one operation where sub-second
/// precision and post-2038 timestamps both matter to the caller setting them.
pub const TIMESPEC_PAIR_WIRE_LEN: usize = 4 * 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimespecPair {
    pub atime_sec: u64,
    pub atime_nsec: u64,
    pub mtime_sec: u64,
    pub mtime_nsec: u64,
}

pub fn encode_timespec_pair(out: &mut Vec<u8>, ts: &TimespecPair) {
    crate::integers::put_u64(out, ts.atime_sec);
    crate::integers::put_u64(out, ts.atime_nsec);
    crate::integers::put_u64(out, ts.mtime_sec);
    crate::integers::put_u64(out, ts.mtime_nsec);
}

pub fn decode_timespec_pair(buf: &[u8], off: usize) -> Result<TimespecPair, WireError> {
    use crate::integers::get_u64;
    Ok(TimespecPair {
        atime_sec: get_u64(buf, off)?,
        atime_nsec: get_u64(buf, off + 8)?,
        mtime_sec: get_u64(buf, off + 16)?,
        mtime_nsec: get_u64(buf, off + 24)?,
    })
}
