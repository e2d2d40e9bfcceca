use crate::error::WireError;

/// Dense operation-id enumeration carried in every request frame's 2-byte
/// op-id field. Values are part of the wire contract and must never be
/// renumbered once shipped — a client and server built from different
/// revisions of this table would silently dispatch the wrong handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OpId {
    Quit = 0,
    Getattr = 1,
    Readlink = 2,
    Mknod = 3,
    Mkdir = 4,
    Unlink = 5,
    Rmdir = 6,
    Symlink = 7,
    Rename = 8,
    Link = 9,
    Chmod = 10,
    Chown = 11,
    Truncate = 12,
    Open = 13,
    Read = 14,
    Write = 15,
    Statfs = 16,
    Flush = 17,
    Release = 18,
    Fsync = 19,
    Setxattr = 20,
    Getxattr = 21,
    Listxattr = 22,
    Removexattr = 23,
    Opendir = 24,
    Readdir = 25,
    Releasedir = 26,
    Fsyncdir = 27,
    Access = 28,
    Create = 29,
    Ftruncate = 30,
    Fgetattr = 31,
    Lock = 32,
    Utimens = 33,
    Bmap = 34,
    Ioctl = 35,
    Poll = 36,
}

/// One past the highest assigned [`OpId`]. The server's operation table is
/// sized to this so that an unassigned id within the dense range still
/// resolves to an explicit `None` entry (answered with `ENOSYS`) rather than
/// an out-of-bounds id being rejected differently than an in-range empty
/// slot.
pub const OP_TABLE_LEN: usize = 37;

impl OpId {
    pub const ALL: [OpId; OP_TABLE_LEN] = [
        OpId::Quit,
        OpId::Getattr,
        OpId::Readlink,
        OpId::Mknod,
        OpId::Mkdir,
        OpId::Unlink,
        OpId::Rmdir,
        OpId::Symlink,
        OpId::Rename,
        OpId::Link,
        OpId::Chmod,
        OpId::Chown,
        OpId::Truncate,
        OpId::Open,
        OpId::Read,
        OpId::Write,
        OpId::Statfs,
        OpId::Flush,
        OpId::Release,
        OpId::Fsync,
        OpId::Setxattr,
        OpId::Getxattr,
        OpId::Listxattr,
        OpId::Removexattr,
        OpId::Opendir,
        OpId::Readdir,
        OpId::Releasedir,
        OpId::Fsyncdir,
        OpId::Access,
        OpId::Create,
        OpId::Ftruncate,
        OpId::Fgetattr,
        OpId::Lock,
        OpId::Utimens,
        OpId::Bmap,
        OpId::Ioctl,
        OpId::Poll,
    ];

    #[inline]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Ids outside the dense range are a decode error; ids inside the range
    /// that happen to have no handler are a dispatch-time `ENOSYS`, not a
    /// decode error — the two failure modes are deliberately distinct (see
    /// `kennyfs-core`'s operation table).
    pub fn try_from_u16(raw: u16) -> Result<OpId, WireError> {
        OpId::ALL
            .get(raw as usize)
            .copied()
            .ok_or(WireError::UnknownOpId(raw))
    }
}

impl TryFrom<u16> for OpId {
    type Error = WireError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        OpId::try_from_u16(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_dense_and_round_trips() {
        for (idx, op) in OpId::ALL.iter().enumerate() {
            assert_eq!(*op as usize, idx);
            assert_eq!(OpId::try_from_u16(idx as u16).unwrap(), *op);
        }
    }

    #[test]
    fn out_of_range_id_is_rejected() {
        assert_eq!(
            OpId::try_from_u16(OP_TABLE_LEN as u16),
            Err(WireError::UnknownOpId(OP_TABLE_LEN as u16))
        );
    }
}
