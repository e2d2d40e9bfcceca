//! POSIX errno values the protocol itself must name (return-code fallbacks,
//! argument-shape and not-implemented replies). `kennyfs-core` re-exports the
//! full `libc` errno surface for backend implementations; this module only
//! carries the handful the wire layer and handler dispatch need without
//! pulling `libc` into a crate that otherwise has zero platform dependence.

pub const EINVAL: i32 = 22;
pub const ENOSYS: i32 = 38;
pub const ENOMEM: i32 = 12;
pub const EREMOTEIO: i32 = 121;
pub const EBADF: i32 = 9;
