//! Ring buffers, RX framing, connection/handle tables, the backend-operations
//! trait, and the operation catalogue shared by the KennyFS server and
//! client. This crate owns spec.md's data model (§3) and component B (§4.B),
//! plus the parts of component D (§4.D) that are symmetric between server
//! and client: request/reply body shapes, the `Backend` trait, and the
//! handle tables. It never opens a socket — `kennyfs-server` and
//! `kennyfs-client` do that, driving these types from their own I/O loops.

pub mod backend;
pub mod connection;
pub mod context;
pub mod errno;
pub mod framer;
pub mod handles;
pub mod ops;
pub mod reply;
pub mod ring;

pub use backend::{Backend, DirEntry, OpenReply};
pub use connection::Connection;
pub use context::Context;
pub use errno::{BackendResult, Errno};
pub use framer::{FramingError, Framer, RawRequest};
pub use handles::{DirHandle, DirHandleTable, FileHandle};
pub use ops::{decode_reply, decode_request, encode_dir_entry, encode_reply_open, encode_reply_stat, iter_dir_entries, Reply, Request};
pub use ring::{Ring, RingError};
