//! The network brick's client-side dispatcher (spec.md §4.D, §5): the half
//! of the protocol that turns a local filesystem call into a request frame,
//! blocks for one round trip on a single TCP connection, and decodes the
//! reply back into the shape the upper filesystem layer expects. Pairs with
//! `kennyfs-server`, sharing `kennyfs-core`'s operation catalogue so the two
//! sides can never drift apart on wire layout.

pub mod dispatcher;
pub mod error;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, Result};
