use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};


/// Full-width comparison of two equal-length byte strings; yields 1 when
/// they differ. Never exits early on a mismatching byte.
pub(crate) fn ct_differs(a: &[u8], b: &[u8]) -> Choice {
    !a.ct_eq(b)
}


/// Overwrites `dst[i]` with `src[i]` for all i when `replace` is 1, in a
/// single fixed-time pass; leaves `dst` untouched when `replace` is 0.
pub(crate) fn ct_select(dst: &mut [u8], src: &[u8], replace: Choice) {
    debug_assert_eq!(dst.len(), src.len(), "ct_select: length mismatch");
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        d.conditional_assign(s, replace);
    }
}


/// Little-endian u16 from the first two bytes of `bytes`.
pub(crate) fn load_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}


/// Little-endian u32 from the first four bytes of `bytes`.
pub(crate) fn load_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}


/// Little-endian u64 from the first eight bytes of `bytes`.
pub(crate) fn load_u64_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ct_differs() {
        let a = [1u8, 2, 3, 4];
        let b = [1u8, 2, 3, 4];
        let c = [1u8, 2, 3, 5];
        assert_eq!(bool::from(ct_differs(&a, &b)), false);
        assert_eq!(bool::from(ct_differs(&a, &c)), true);
    }

    #[test]
    fn test_ct_select() {
        let mut dst = [0u8; 4];
        let src = [9u8; 4];
        ct_select(&mut dst, &src, Choice::from(0));
        assert_eq!(dst, [0u8; 4]);
        ct_select(&mut dst, &src, Choice::from(1));
        assert_eq!(dst, src);
    }

    #[test]
    fn test_le_loads() {
        let bytes = [0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(load_u16_le(&bytes), 0x0201);
        assert_eq!(load_u32_le(&bytes), 0x0403_0201);
        assert_eq!(load_u64_le(&bytes), 0x0807_0605_0403_0201);
    }
}
