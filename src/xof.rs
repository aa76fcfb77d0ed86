//! SHAKE plumbing shared by every component: one-shot hashing, seed
//! expansion, the sampling XOF, and domain-separated secret derivation.
//!
//! Each call starts from a fresh sponge state; states are never reused
//! across absorptions of different inputs. Absorb-after-finalize cannot be
//! expressed: finalizing consumes the builder and returns a squeeze-only
//! reader.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{CShake256, CShake256Core, Shake128, Shake256};

use crate::SEED_SIZE;


/// SHAKE128 squeeze stream over the concatenation of `parts`.
pub(crate) fn shake128(parts: &[&[u8]]) -> impl XofReader {
    let mut hasher = Shake128::default();
    parts.iter().for_each(|p| hasher.update(p));
    hasher.finalize_xof()
}


/// SHAKE256 of the concatenation of `parts`, squeezed into `out`.
pub(crate) fn shake256_into(parts: &[&[u8]], out: &mut [u8]) {
    let mut hasher = Shake256::default();
    parts.iter().for_each(|p| hasher.update(p));
    hasher.finalize_xof().read(out);
}


/// H(x) = SHAKE256(x, 32): the public-key and ciphertext hash.
pub(crate) fn h(bytes: &[u8]) -> [u8; SEED_SIZE] {
    let mut out = [0u8; SEED_SIZE];
    shake256_into(&[bytes], &mut out);
    out
}


/// PRF for noise sampling: SHAKE256(seed ‖ nonce) squeezed into `out`.
pub(crate) fn prf_into(seed: &[u8; SEED_SIZE], nonce: u8, out: &mut [u8]) {
    shake256_into(&[seed, &[nonce]], out);
}


/// Domain-separated derivation of the shared secret.
///
/// A non-empty customization string selects cSHAKE256 with an empty
/// function-name string per SP 800-185; an empty one selects plain
/// SHAKE256. The two framings are deliberately not interchangeable.
pub(crate) fn shake256_custom_into(parts: &[&[u8]], customization: &[u8], out: &mut [u8]) {
    if customization.is_empty() {
        shake256_into(parts, out);
    } else {
        let mut hasher = CShake256::from_core(CShake256Core::new(customization));
        parts.iter().for_each(|p| hasher.update(p));
        hasher.finalize_xof().read(out);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_customization_is_plain_shake() {
        let mut plain = [0u8; 32];
        let mut custom = [0u8; 32];
        shake256_into(&[b"input"], &mut plain);
        shake256_custom_into(&[b"input"], b"", &mut custom);
        assert_eq!(plain, custom);
    }

    #[test]
    fn test_customization_separates_domains() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        let mut c = [0u8; 32];
        shake256_custom_into(&[b"input"], b"A", &mut a);
        shake256_custom_into(&[b"input"], b"B", &mut b);
        shake256_into(&[b"input"], &mut c);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_split_absorb_matches_concatenation() {
        let mut split = [0u8; 64];
        let mut joined = [0u8; 64];
        shake256_into(&[b"ab", b"cd"], &mut split);
        shake256_into(&[b"abcd"], &mut joined);
        assert_eq!(split, joined);
    }

    #[test]
    fn test_streamed_squeeze_matches_one_shot() {
        let mut one_shot = [0u8; 96];
        shake256_into(&[b"stream"], &mut one_shot);

        let mut hasher = Shake256::default();
        hasher.update(b"stream");
        let mut reader = hasher.finalize_xof();
        let mut streamed = [0u8; 96];
        reader.read(&mut streamed[..32]);
        reader.read(&mut streamed[32..]);
        assert_eq!(one_shot, streamed);
    }
}
