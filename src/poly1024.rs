//! Polynomial arithmetic modulo q = 12289 on x^1024 + 1.
//!
//! The forward NTT takes natural-order input and produces bit-reversed
//! output; the inverse consumes bit-reversed input and restores natural
//! order. Twiddle factors are Montgomery-form powers of a primitive
//! 2048th root of unity, generated at compile time. Coefficients are kept
//! in [0, q) across every butterfly.

use sha3::digest::XofReader;
use zeroize::Zeroize;

use crate::util;
use crate::xof;

pub(crate) const N: usize = 1024;
pub(crate) const Q: u32 = 12289;

const LOG_N: u32 = 10;
const RLOG: u32 = 18;
const QINV: u32 = 12287; // -q^-1 mod 2^18
const HALF_Q: u32 = Q / 2;
const SHAKE128_RATE: usize = 168;

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

// Primitive 2n-th root of unity mod q, derived from the smallest
// generator candidate whose (q-1)/2n power has exact order 2n.
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

// n^-1 * R mod q, applied after the inverse transform.
#[allow(clippy::cast_possible_truncation)]
const NINV_MONTGOMERY: u16 =
    ((pow_mod(N as u64, Q as u64 - 2, Q as u64) << RLOG) % Q as u64) as u16;

// R^2 mod q, lifts one pointwise-multiply operand into Montgomery form.
#[allow(clippy::cast_possible_truncation)]
const R_SQUARED: u16 = ((1u64 << (2 * RLOG)) % Q as u64) as u16;


// Reduces x in [0, 2q) to [0, q) without branching.
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

// a * b * R^-1 mod q, with b in Montgomery form; result in [0, q).
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

/// Maps any 16-bit value to its canonical representative in [0, q).
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
    for len in [512, 256, 128, 64, 32, 16, 8, 4, 2, 1] {
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
///
/// Walks the twiddle table backwards; the index reversal supplies both
/// the inversion and the sign of each Gentleman-Sande factor.
pub(crate) fn inv_ntt(f: &mut Poly) {
    let mut k = N - 1;
    for len in [1, 2, 4, 8, 16, 32, 64, 128, 256, 512] {
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
/// reduced. Callers working with untrusted input freeze afterwards.
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


/// x -> round(2^d * x / q) mod 2^d, in place. The modular wrap of the top
/// value is applied by the d-bit mask in [`byte_encode`].
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
/// stream, pulling one SHAKE128 rate block at a time and masking 16-bit
/// candidates to 14 bits.
pub(crate) fn uniform(mut reader: impl XofReader) -> Poly {
    let mut p = [0u16; N];
    let mut buf = [0u8; SHAKE128_RATE];
    let mut count = 0usize;
    // The rejection loop depends only on the public matrix seed, which
    // crosses the trust boundary in the clear, so it need not be
    // constant time.
    while count < N {
        reader.read(&mut buf);
        for chunk in buf.chunks_exact(2) {
            let val = util::load_u16_le(chunk) & 0x3FFF;
            if u32::from(val) < Q && count < N {
                p[count] = val;
                count += 1;
            }
        }
    }
    p
}

/// Draws a noise polynomial from the centered binomial ψ₈: per
/// coefficient, the hamming weight of one PRF byte minus the weight of
/// the next, mapped into [0, q).
pub(crate) fn sample_noise(seed: &[u8; 32], nonce: u8) -> Poly {
    let mut buf = [0u8; 2 * N];
    xof::prf_into(seed, nonce, &mut buf);
    let mut p = [0u16; N];
    for i in 0..N {
        let x = count_ones(u32::from(buf[2 * i]));
        let y = count_ones(u32::from(buf[2 * i + 1]));
        p[i] = sub(x, y);
    }
    buf.zeroize();
    p
}

// Bit population count without data-dependent branches.
#[allow(clippy::cast_possible_truncation)]
fn count_ones(x: u32) -> u16 {
    let x = (x & 0x5555_5555) + ((x >> 1) & 0x5555_5555);
    let x = (x & 0x3333_3333) + ((x >> 2) & 0x3333_3333);
    let x = (x & 0x0F0F_0F0F) + ((x >> 4) & 0x0F0F_0F0F);
    x as u16
}


/// Spreads each of the 256 message bits over four coefficients with
/// value q/2.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn from_message(msg: &[u8; 32]) -> Poly {
    let mut p = [0u16; N];
    for i in 0..256 {
        let bit = u16::from((msg[i >> 3] >> (i & 7)) & 1);
        let v = bit.wrapping_neg() & (HALF_Q as u16);
        p[i] = v;
        p[i + 256] = v;
        p[i + 512] = v;
        p[i + 768] = v;
    }
    p
}

/// Recovers the message: a bit is 1 iff its four carrier coefficients sit
/// closer to q/2 than to 0 in total.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_message(p: &Poly) -> [u8; 32] {
    let mut msg = [0u8; 32];
    for i in 0..256 {
        let mut t = 0u32;
        for k in 0..4 {
            t += u32::from(flip_abs(p[i + 256 * k]));
        }
        let bit = (t.wrapping_sub(Q) >> 31) as u8;
        msg[i >> 3] |= bit << (i & 7);
    }
    msg
}

// |freeze(x) - q/2| without branching on the value.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn flip_abs(x: u16) -> u16 {
    let r = i32::from(freeze(x)) - HALF_Q as i32;
    let m = r >> 31;
    ((r + m) ^ m) as u16
}
