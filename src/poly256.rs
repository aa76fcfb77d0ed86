//! Polynomial arithmetic modulo q = 7681 on x^256 + 1.
//!
//! Same transform design as the q = 12289 kernel: merged-psi butterflies
//! over a compile-time Montgomery twiddle table, forward natural-to-
//! bit-reversed, inverse back again, coefficients held in [0, q).

use sha3::digest::XofReader;
use zeroize::Zeroize;

use crate::util;
use crate::xof;

pub(crate) const N: usize = 256;
pub(crate) const Q: u32 = 7681;

const LOG_N: u32 = 8;
const RLOG: u32 = 18;
const QINV: u32 = 7679; // -q^-1 mod 2^18
const SHAKE128_RATE: usize = 168;
const MAX_ETA: usize = 5;

pub(crate) type Poly = [u16; N];


const fn pow_mod(base: u64, exp: u64, modulus: u64) -> u64 {
    let mut acc = 1u64;
    let mut base = base % modulus;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * base % modulus;
        }
        base = base * base % modulus;
        exp >>= 1;
    }
    acc
}

const fn primitive_root() -> u64 {
    let q = Q as u64;
    let n = N as u64;
    let mut g = 2u64;
    loop {
        let x = pow_mod(g, (q - 1) / (2 * n), q);
        if pow_mod(x, n, q) == q - 1 {
            return x;
        }
        g += 1;
    }
}

const PSI: u64 = primitive_root();

const fn bit_reverse(i: usize) -> usize {
    ((i as u16).reverse_bits() >> (16 - LOG_N)) as usize
}

#[allow(clippy::cast_possible_truncation)]
const fn gen_psi_table() -> [u16; N] {
    let q = Q as u64;
    let mut table = [0u16; N];
    let mut i = 0;
    while i < N {
        let zeta = pow_mod(PSI, bit_reverse(i) as u64, q);
        table[i] = ((zeta << RLOG) % q) as u16; // Montgomery form
        i += 1;
    }
    table
}

static PSIS_BITREV_MONTGOMERY: [u16; N] = gen_psi_table();

#[allow(clippy::cast_possible_truncation)]
const NINV_MONTGOMERY: u16 =
    ((pow_mod(N as u64, Q as u64 - 2, Q as u64) << RLOG) % Q as u64) as u16;

#[allow(clippy::cast_possible_truncation)]
const R_SQUARED: u16 = ((1u64 << (2 * RLOG)) % Q as u64) as u16;


#[inline]
#[allow(clippy::cast_possible_truncation)]
fn csub(x: u32) -> u16 {
    let d = x.wrapping_sub(Q);
    d.wrapping_add(Q & 0u32.wrapping_sub(d >> 31)) as u16
}

#[inline]
fn montgomery_reduce(a: u32) -> u32 {
    let u = a.wrapping_mul(QINV) & ((1u32 << RLOG) - 1);
    (a + u * Q) >> RLOG
}

#[inline]
fn fqmul(a: u16, b: u16) -> u16 {
    csub(montgomery_reduce(u32::from(a) * u32::from(b)))
}

#[inline]
pub(crate) fn add(a: u16, b: u16) -> u16 {
    csub(u32::from(a) + u32::from(b))
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn sub(a: u16, b: u16) -> u16 {
    let d = u32::from(a).wrapping_sub(u32::from(b));
    d.wrapping_add(Q & 0u32.wrapping_sub(d >> 31)) as u16
}

/// Canonical representative in [0, q) of any 16-bit value.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn freeze(x: u16) -> u16 {
    const M: u64 = (1u64 << 32) / (Q as u64);
    let x = u64::from(x);
    let quot = (x * M) >> 32;
    csub((x - quot * Q as u64) as u32)
}


/// Forward NTT, in place. Natural-order input, bit-reversed output.
pub(crate) fn ntt(f: &mut Poly) {
    let mut k = 1;
    for len in [128, 64, 32, 16, 8, 4, 2, 1] {
        for start in (0..N).step_by(2 * len) {
            let zeta = PSIS_BITREV_MONTGOMERY[k];
            k += 1;
            for j in start..(start + len) {
                let t = fqmul(zeta, f[j + len]);
                f[j + len] = sub(f[j], t);
                f[j] = add(f[j], t);
            }
        }
    }
}

/// Inverse NTT, in place. Bit-reversed input, natural-order output.
pub(crate) fn inv_ntt(f: &mut Poly) {
    let mut k = N - 1;
    for len in [1, 2, 4, 8, 16, 32, 64, 128] {
        for start in (0..N).step_by(2 * len) {
            let zeta = PSIS_BITREV_MONTGOMERY[k];
            k -= 1;
            for j in start..(start + len) {
                let t = f[j];
                f[j] = add(t, f[j + len]);
                f[j + len] = fqmul(zeta, sub(f[j + len], t));
            }
        }
    }
    for c in f.iter_mut() {
        *c = fqmul(*c, NINV_MONTGOMERY);
    }
}

/// Pointwise product of two transform-domain polynomials.
pub(crate) fn pointwise(a: &Poly, b: &Poly) -> Poly {
    core::array::from_fn(|i| fqmul(fqmul(a[i], R_SQUARED), b[i]))
}

pub(crate) fn poly_add(a: &Poly, b: &Poly) -> Poly {
    core::array::from_fn(|i| add(a[i], b[i]))
}

pub(crate) fn poly_sub(a: &Poly, b: &Poly) -> Poly {
    core::array::from_fn(|i| sub(a[i], b[i]))
}


/// Packs coefficients at `d` bits each, little-endian within each
/// coefficient, ascending coefficient order.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn byte_encode(d: u32, coeffs: &Poly, bytes: &mut [u8]) {
    debug_assert_eq!(bytes.len(), N * d as usize / 8, "byte_encode: output length");
    let mask = (1u64 << d) - 1;
    let mut temp = 0u64;
    let mut bit_index = 0usize;
    let mut byte_index = 0usize;
    for coeff in coeffs {
        temp |= (u64::from(*coeff) & mask) << bit_index;
        bit_index += d as usize;
        while bit_index > 7 {
            bytes[byte_index] = temp as u8;
            temp >>= 8;
            byte_index += 1;
            bit_index -= 8;
        }
    }
}

/// Inverse of [`byte_encode`]; values are masked to `d` bits, not
/// reduced.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn byte_decode(d: u32, bytes: &[u8], coeffs: &mut Poly) {
    debug_assert_eq!(bytes.len(), N * d as usize / 8, "byte_decode: input length");
    let mask = (1u64 << d) - 1;
    let mut temp = 0u64;
    let mut int_index = 0usize;
    let mut bit_index = 0usize;
    for byte in bytes {
        temp |= u64::from(*byte) << bit_index;
        bit_index += 8;
        while bit_index >= d as usize {
            coeffs[int_index] = (temp & mask) as u16;
            temp >>= d;
            bit_index -= d as usize;
            int_index += 1;
        }
    }
}


/// x -> round(2^d * x / q) mod 2^d, in place; the wrap of the top value
/// is applied by the d-bit mask in [`byte_encode`].
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn compress_vector(d: u32, inout: &mut Poly) {
    const M: u64 = ((1u64 << 36) + Q as u64 - 1) / (Q as u64);
    for x in inout.iter_mut() {
        let y = (u64::from(*x) << d) + u64::from(Q >> 1);
        *x = ((y * M) >> 36) as u16;
    }
}

/// y -> round(q * y / 2^d), in place.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn decompress_vector(d: u32, inout: &mut Poly) {
    for y in inout.iter_mut() {
        let qy = Q * u32::from(*y) + (1u32 << (d - 1));
        *y = (qy >> d) as u16;
    }
}


/// Rejection-samples a uniform transform-domain polynomial from an XOF
/// stream, masking 16-bit candidates to 13 bits.
pub(crate) fn uniform(mut reader: impl XofReader) -> Poly {
    let mut p = [0u16; N];
    let mut buf = [0u8; SHAKE128_RATE];
    let mut count = 0usize;
    // Rejection depends only on the public matrix seed; variable time is
    // acceptable here.
    while count < N {
        reader.read(&mut buf);
        for chunk in buf.chunks_exact(2) {
            let val = util::load_u16_le(chunk) & 0x1FFF;
            if u32::from(val) < Q && count < N {
                p[count] = val;
                count += 1;
            }
        }
    }
    p
}

/// Draws a noise polynomial from the centered binomial ψ_eta with
/// eta ≤ 5: 2·eta PRF bits per coefficient, difference of hamming
/// weights, mapped into [0, q).
pub(crate) fn sample_noise(seed: &[u8; 32], nonce: u8, eta: usize) -> Poly {
    debug_assert!(eta >= 1 && eta <= MAX_ETA, "sample_noise: eta out of range");
    let mut buf = [0u8; 2 * N * MAX_ETA / 8];
    let bytes = &mut buf[..2 * N * eta / 8];
    xof::prf_into(seed, nonce, bytes);
    let p = sample_poly_cbd(bytes);
    buf.zeroize();
    p
}

fn sample_poly_cbd(bytes: &[u8]) -> Poly {
    let eta = bytes.len() * 8 / (2 * N);
    let mut p = [0u16; N];
    let mut temp = 0u32;
    let mut int_index = 0usize;
    let mut bit_index = 0usize;
    for byte in bytes {
        temp |= u32::from(*byte) << bit_index;
        bit_index += 8;
        while bit_index >= 2 * eta && int_index < N {
            let x = count_ones(temp & ((1u32 << eta) - 1));
            let y = count_ones((temp >> eta) & ((1u32 << eta) - 1));
            p[int_index] = sub(x, y);
            temp >>= 2 * eta;
            bit_index -= 2 * eta;
            int_index += 1;
        }
    }
    p
}

#[allow(clippy::cast_possible_truncation)]
fn count_ones(x: u32) -> u16 {
    let x = (x & 0x5555_5555) + ((x >> 1) & 0x5555_5555);
    let x = (x & 0x3333_3333) + ((x >> 2) & 0x3333_3333);
    let x = (x & 0x0F0F_0F0F) + ((x >> 4) & 0x0F0F_0F0F);
    x as u16
}


#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::vec;
    use alloc::vec::Vec;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_poly(rng: &mut impl Rng) -> Poly {
        core::array::from_fn(|_| rng.gen_range(0..Q) as u16)
    }

    #[test]
    fn test_psi_table_sanity() {
        assert_eq!(pow_mod(PSI, 2 * N as u64, Q as u64), 1);
        assert_eq!(pow_mod(PSI, N as u64, Q as u64), Q as u64 - 1);
        assert_eq!(PSIS_BITREV_MONTGOMERY[0], ((1u64 << RLOG) % Q as u64) as u16);
    }

    #[test]
    fn test_reduction_helpers() {
        for x in [0u16, 1, 3840, 7680, 7681, 8191, u16::MAX] {
            assert_eq!(u32::from(freeze(x)), u32::from(x) % Q);
        }
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(11);
        for _ in 0..1000 {
            let a = rng.gen_range(0..Q) as u16;
            let b = rng.gen_range(0..Q) as u16;
            assert_eq!(u32::from(add(a, b)), (u32::from(a) + u32::from(b)) % Q);
            assert_eq!(u32::from(sub(a, b)), (Q + u32::from(a) - u32::from(b)) % Q);
            let lifted = fqmul(a, R_SQUARED);
            assert_eq!(u32::from(fqmul(lifted, b)), u32::from(a) * u32::from(b) % Q);
        }
    }

    #[test]
    fn test_ntt_round_trip() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(12);
        for _ in 0..16 {
            let original = random_poly(&mut rng);
            let mut p = original;
            ntt(&mut p);
            inv_ntt(&mut p);
            assert_eq!(p, original);
        }
    }

    #[test]
    fn test_negacyclic_wraparound() {
        // x * x^255 = x^256 = -1 mod (x^256 + 1)
        let mut a = [0u16; N];
        let mut b = [0u16; N];
        a[1] = 1;
        b[N - 1] = 1;
        ntt(&mut a);
        ntt(&mut b);
        let mut prod = pointwise(&a, &b);
        inv_ntt(&mut prod);
        let mut expect = [0u16; N];
        expect[0] = (Q - 1) as u16;
        assert_eq!(prod, expect);
    }

    #[test]
    fn test_pack_round_trips() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(13);
        for d in [3u32, 11, 13] {
            let num_bytes = N * d as usize / 8;
            let bytes1: Vec<u8> = (0..num_bytes).map(|_| rng.gen()).collect();
            let mut p = [0u16; N];
            byte_decode(d, &bytes1, &mut p);
            let mut bytes2 = vec![0u8; num_bytes];
            byte_encode(d, &p, &mut bytes2);
            assert_eq!(bytes1, bytes2, "byte round trip failed at d = {d}");
        }

        let original = random_poly(&mut rng);
        let mut packed = vec![0u8; N * 13 / 8];
        byte_encode(13, &original, &mut packed);
        let mut decoded = [0u16; N];
        byte_decode(13, &packed, &mut decoded);
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_compress_error_bounds() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(14);
        for (d, tolerance) in [(11u32, 2i32), (3, (Q as i32 + 15) / 16)] {
            let original = random_poly(&mut rng);
            let mut p = original;
            compress_vector(d, &mut p);
            let mut packed = vec![0u8; N * d as usize / 8];
            byte_encode(d, &p, &mut packed);
            let mut restored = [0u16; N];
            byte_decode(d, &packed, &mut restored);
            decompress_vector(d, &mut restored);
            for (a, b) in original.iter().zip(restored.iter()) {
                let diff = i32::from(*a) - i32::from(*b);
                let dist = diff.rem_euclid(Q as i32).min((-diff).rem_euclid(Q as i32));
                assert!(dist <= tolerance, "d = {d}: coefficient drifted by {dist}");
            }
        }
    }

    #[test]
    fn test_uniform_sampling() {
        let seed = [4u8; 32];
        let a = uniform(xof::shake128(&[&seed]));
        let b = uniform(xof::shake128(&[&seed]));
        assert_eq!(a, b);
        assert!(a.iter().all(|&c| u32::from(c) < Q));
    }

    #[test]
    fn test_noise_sampling() {
        let seed = [5u8; 32];
        for eta in [3usize, 4, 5] {
            let p = sample_noise(&seed, 0, eta);
            let bound = eta as u32;
            for &c in &p {
                let c = u32::from(c);
                assert!(c <= bound || c >= Q - bound, "coefficient {c} outside ψ_{eta}");
            }
        }
        assert_ne!(sample_noise(&seed, 0, 5), sample_noise(&seed, 1, 5));
    }

    #[test]
    fn test_bit_codec_round_trip() {
        // the d = 1 path carries messages in and out of polynomials
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(15);
        let mut msg = [0u8; 32];
        rng.fill(&mut msg);
        let mut p = [0u16; N];
        byte_decode(1, &msg, &mut p);
        decompress_vector(1, &mut p);
        assert!(p.iter().all(|&c| c == 0 || c == ((Q as u16 + 1) / 2)));
        compress_vector(1, &mut p);
        let mut out = [0u8; 32];
        byte_encode(1, &p, &mut out);
        assert_eq!(msg, out);
    }
}
