use thiserror::Error;

/// Failures the round-trip primitive itself can raise, before a backend
/// return code is even in hand. Every variant here is, per spec.md §7
/// ("the client dispatcher maps any transport-level failure into a single
/// `EREMOTEIO`"), collapsed to [`kennyfs_core::errno::EREMOTEIO`] once it
/// reaches a [`crate::Dispatcher`] method's [`kennyfs_core::backend::Backend`]
/// surface — this richer enum exists for callers (and tests) that want to
/// know *why* the remote call failed.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed reply: {0}")]
    Wire(#[from] kennyfs_wire::WireError),

    #[error("server sent an unexpected start-of-protocol handshake")]
    HandshakeMismatch,

    #[error("request body of {len} bytes exceeds this connection's limit of {limit}")]
    BodyTooLarge { len: usize, limit: u32 },
}

pub type Result<T> = std::result::Result<T, DispatchError>;
