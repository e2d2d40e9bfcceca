use thiserror::Error;

/// Errors raised by the wire codec. The codec never touches a socket; every
/// variant here is a pure decoding failure against a byte span already in
/// memory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("input too short: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("dual-path payload missing the NUL separator between path1 and path2")]
    MissingPathSeparator,

    #[error("unknown operation id {0}")]
    UnknownOpId(u16),

    #[error("announced body length {len} exceeds the per-connection limit of {limit}")]
    BodyTooLarge { len: u32, limit: u32 },
}

pub type Result<T> = std::result::Result<T, WireError>;
