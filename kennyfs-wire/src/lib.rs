//! Pure wire codec for the KennyFS network protocol: big-endian integer
//! framing, stat/timespec encoding, dual-path payloads, the frame/reply
//! headers, the start-of-protocol handshake string, and the dense op-id
//! table. Nothing in this crate touches a socket or holds state across
//! calls — every function here is `(bytes) -> T` or `(T) -> bytes`.

pub mod errno;
pub mod error;
pub mod frame;
pub mod integers;
pub mod opcode;
pub mod path;
pub mod stat;

pub use error::{Result, WireError};
pub use frame::{
    decode_reply_header, decode_request_header, encode_reply_header, encode_request_header,
    ReplyHeader, RequestHeader, REPLY_HEADER_LEN, REQUEST_HEADER_LEN, SOP,
};
pub use opcode::{OpId, OP_TABLE_LEN};
pub use path::{decode_dual_path, encode_dual_path};
pub use stat::{
    decode_stat, decode_timespec_pair, encode_stat, encode_timespec_pair, Stat, TimespecPair,
    STAT_WIRE_LEN, TIMESPEC_PAIR_WIRE_LEN,
};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn stat_round_trip_low_32_bits(
            mode in any::<u32>(), nlink in any::<u32>(), uid in any::<u32>(),
            gid in any::<u32>(), blksize in any::<u32>(),
            dev in any::<u32>(), ino in any::<u32>(), rdev in any::<u32>(),
            size in any::<u32>(), blocks in any::<u32>(),
            atime in any::<u32>(), mtime in any::<u32>(), ctime in any::<u32>(),
        ) {
            let stat = Stat {
                dev: dev as u64, ino: ino as u64, mode, nlink, uid, gid,
                rdev: rdev as u64, size: size as u64, blksize,
                blocks: blocks as u64, atime: atime as u64, mtime: mtime as u64,
                ctime: ctime as u64,
            };
            let mut buf = Vec::new();
            encode_stat(&mut buf, &stat);
            let back = decode_stat(&buf, 0).unwrap();
            prop_assert_eq!(back, stat);
        }

        #[test]
        fn dual_path_round_trip(p1 in "[a-zA-Z0-9/_.]{0,64}", p2 in "[a-zA-Z0-9/_.]{0,64}") {
            let mut buf = Vec::new();
            encode_dual_path(&mut buf, p1.as_bytes(), p2.as_bytes());
            let (d1, d2) = decode_dual_path(&buf).unwrap();
            prop_assert_eq!(d1, p1.as_bytes());
            prop_assert_eq!(d2, p2.as_bytes());
        }

        #[test]
        fn return_code_round_trip(code in i32::MIN..=i32::MAX) {
            let code = i64::from(code);
            if let Some(biased) = frame::encode_return_code(code) {
                prop_assert_eq!(i64::from(frame::decode_return_code(biased)), code);
            }
        }
    }
}
