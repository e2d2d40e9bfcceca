//! Backend errors are plain positive POSIX errno magnitudes (`libc::ENOENT`,
//! not `-libc::ENOENT`) — the sign only gets attached once, at the wire
//! boundary, via [`kennyfs_wire::frame::encode_return_code`]. This mirrors
//! "any backend error is returned verbatim as its positive errno magnitude"
//! from spec.md §7.

pub type Errno = i32;

pub const ENOSYS: Errno = libc::ENOSYS;
pub const EINVAL: Errno = libc::EINVAL;
pub const ENOMEM: Errno = libc::ENOMEM;
pub const EBADF: Errno = libc::EBADF;
pub const EREMOTEIO: Errno = libc::EREMOTEIO;
pub const ENOENT: Errno = libc::ENOENT;
pub const EEXIST: Errno = libc::EEXIST;
pub const EISDIR: Errno = libc::EISDIR;
pub const ENOTDIR: Errno = libc::ENOTDIR;
pub const ENOTEMPTY: Errno = libc::ENOTEMPTY;
pub const EFBIG: Errno = libc::EFBIG;

pub type BackendResult<T> = Result<T, Errno>;
