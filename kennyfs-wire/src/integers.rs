use crate::error::WireError;

/// Big-endian, fixed-width integer framing. Decoders copy bytes into a
/// temporary integer slot rather than assuming the input is aligned for a
/// transmute — the wire is a byte stream, not a struct overlay.
pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn get_u8(buf: &[u8], off: usize) -> Result<u8, WireError> {
    buf.get(off).copied().ok_or(WireError::Truncated { need: off + 1, have: buf.len() })
}

pub fn get_u16(buf: &[u8], off: usize) -> Result<u16, WireError> {
    let end = off + 2;
    let slot: [u8; 2] = buf
        .get(off..end)
        .ok_or(WireError::Truncated { need: end, have: buf.len() })?
        .try_into()
        .expect("slice of length 2");
    Ok(u16::from_be_bytes(slot))
}

pub fn get_u32(buf: &[u8], off: usize) -> Result<u32, WireError> {
    let end = off + 4;
    let slot: [u8; 4] = buf
        .get(off..end)
        .ok_or(WireError::Truncated { need: end, have: buf.len() })?
        .try_into()
        .expect("slice of length 4");
    Ok(u32::from_be_bytes(slot))
}

pub fn get_u64(buf: &[u8], off: usize) -> Result<u64, WireError> {
    let end = off + 8;
    let slot: [u8; 8] = buf
        .get(off..end)
        .ok_or(WireError::Truncated { need: end, have: buf.len() })?
        .try_into()
        .expect("slice of length 8");
    Ok(u64::from_be_bytes(slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let mut buf = Vec::new();
        put_u16(&mut buf, 0xBEEF);
        put_u32(&mut buf, 0xDEAD_BEEF);
        put_u64(&mut buf, 0x0102_0304_0506_0708);
        assert_eq!(get_u16(&buf, 0).unwrap(), 0xBEEF);
        assert_eq!(get_u32(&buf, 2).unwrap(), 0xDEAD_BEEF);
        assert_eq!(get_u64(&buf, 6).unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn short_read_is_truncated_error() {
        let buf = [0u8; 1];
        assert!(matches!(get_u32(&buf, 0), Err(WireError::Truncated { .. })));
    }
}
