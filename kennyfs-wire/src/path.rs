use crate::error::WireError;
use crate::integers::{get_u32, put_u32};

/// Encodes a two-path argument (symlink/rename/link):
/// `u32 len(path1) | path1 | 0x00 | path2`.
pub fn encode_dual_path(out: &mut Vec<u8>, path1: &[u8], path2: &[u8]) {
    put_u32(out, path1.len() as u32);
    out.extend_from_slice(path1);
    out.push(0);
    out.extend_from_slice(path2);
}

/// Decodes a two-path argument. The single NUL separator right after
/// `path1` is mandatory — its absence (or landing on the wrong byte) is a
/// corruption signal, not a tolerable variant.
pub fn decode_dual_path(buf: &[u8]) -> Result<(&[u8], &[u8]), WireError> {
    let len1 = get_u32(buf, 0)? as usize;
    let len1_end = 4 + len1;
    let sep = *buf
        .get(len1_end)
        .ok_or(WireError::Truncated { need: len1_end + 1, have: buf.len() })?;
    if sep != 0 {
        return Err(WireError::MissingPathSeparator);
    }
    let path1 = &buf[4..len1_end];
    let path2 = buf
        .get(len1_end + 1..)
        .ok_or(WireError::Truncated { need: len1_end + 1, have: buf.len() })?;
    Ok((path1, path2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_path_round_trips() {
        let mut buf = Vec::new();
        encode_dual_path(&mut buf, b"/a/b", b"/a/c");
        let (p1, p2) = decode_dual_path(&buf).unwrap();
        assert_eq!(p1, b"/a/b");
        assert_eq!(p2, b"/a/c");
    }

    #[test]
    fn missing_separator_is_rejected() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 3);
        buf.extend_from_slice(b"abc");
        buf.push(b'X');
        buf.extend_from_slice(b"xyz");
        assert_eq!(decode_dual_path(&buf), Err(WireError::MissingPathSeparator));
    }
}
