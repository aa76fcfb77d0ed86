//! CPA-secure public-key encryption over the Ring-LWE parameter set
//! q = 12289, n = 1024.
//!
//! The public key is the transform-domain polynomial `b̂ = â∘ŝ + ê`
//! packed at 14 bits per coefficient, followed by the 32-byte matrix
//! seed `ρ`. Ciphertexts carry `û` with the same polynomial-and-seed
//! framing as the public key, then the 3-bit-compressed `v`.

use zeroize::{Zeroize, Zeroizing};

use crate::poly1024 as poly;
use crate::poly1024::N;
use crate::xof;
use crate::SEED_SIZE;

pub(crate) const POLY_BYTES: usize = 14 * N / 8; // 1792
pub(crate) const COMPRESSED_BYTES: usize = 3 * N / 8; // 384
pub(crate) const CPA_PUBLIC_KEY_SIZE: usize = POLY_BYTES + SEED_SIZE; // 1824
pub(crate) const CPA_PRIVATE_KEY_SIZE: usize = POLY_BYTES; // 1792
pub(crate) const CPA_CIPHERTEXT_SIZE: usize = CPA_PUBLIC_KEY_SIZE + COMPRESSED_BYTES; // 2208
pub(crate) const PUBLIC_KEY_SIZE: usize = CPA_PUBLIC_KEY_SIZE; // 1824
pub(crate) const PRIVATE_KEY_SIZE: usize =
    CPA_PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE + 2 * SEED_SIZE; // 3680
pub(crate) const CIPHERTEXT_SIZE: usize = CPA_CIPHERTEXT_SIZE + SEED_SIZE; // 2240


/// Expands seed `d` into the public/noise seed pair, samples the secret
/// and error from ψ₈, and writes `pack(b̂) ‖ ρ` and `pack(ŝ)`.
pub(crate) fn cpa_key_gen(d: &[u8; SEED_SIZE], pk: &mut [u8], sk: &mut [u8]) {
    debug_assert_eq!(pk.len(), CPA_PUBLIC_KEY_SIZE, "rlwe keygen: pk length");
    debug_assert_eq!(sk.len(), CPA_PRIVATE_KEY_SIZE, "rlwe keygen: sk length");

    // (ρ, σ) ← SHAKE256(d, 64)
    let mut expanded = Zeroizing::new([0u8; 2 * SEED_SIZE]);
    xof::shake256_into(&[d], expanded.as_mut());
    let rho: [u8; SEED_SIZE] = expanded[..SEED_SIZE].try_into().unwrap();
    let sigma: [u8; SEED_SIZE] = expanded[SEED_SIZE..].try_into().unwrap();

    let a = poly::uniform(xof::shake128(&[&rho]));
    let mut s = poly::sample_noise(&sigma, 0);
    let mut e = poly::sample_noise(&sigma, 1);
    poly::ntt(&mut s);
    poly::ntt(&mut e);

    // b̂ = â∘ŝ + ê
    let b = poly::poly_add(&poly::pointwise(&a, &s), &e);

    poly::byte_encode(14, &b, &mut pk[..POLY_BYTES]);
    pk[POLY_BYTES..].copy_from_slice(&rho);
    poly::byte_encode(14, &s, sk);

    s.zeroize();
    e.zeroize();
}


/// Encrypts the 32-byte message `m` under `pk` with coin `r`, writing the
/// CPA ciphertext `pack(û) ‖ ρ ‖ pack(compress(v))`.
pub(crate) fn cpa_encrypt(pk: &[u8], m: &[u8; SEED_SIZE], r: &[u8; SEED_SIZE], ct: &mut [u8]) {
    debug_assert_eq!(pk.len(), CPA_PUBLIC_KEY_SIZE, "rlwe encrypt: pk length");
    debug_assert_eq!(ct.len(), CPA_CIPHERTEXT_SIZE, "rlwe encrypt: ct length");

    let mut b = [0u16; N];
    poly::byte_decode(14, &pk[..POLY_BYTES], &mut b);
    let rho: &[u8; SEED_SIZE] = pk[POLY_BYTES..].try_into().unwrap();
    let a = poly::uniform(xof::shake128(&[rho]));

    let mut sp = poly::sample_noise(r, 0);
    let mut ep = poly::sample_noise(r, 1);
    let mut epp = poly::sample_noise(r, 2);
    poly::ntt(&mut sp);
    poly::ntt(&mut ep);

    // û = â∘ŝ′ + ê′
    let u = poly::poly_add(&poly::pointwise(&a, &sp), &ep);

    // v = b̂∘ŝ′ back in normal order, plus e″ and the encoded message
    let mut v = poly::pointwise(&b, &sp);
    poly::inv_ntt(&mut v);
    let v = poly::poly_add(&poly::poly_add(&v, &epp), &poly::from_message(m));

    poly::byte_encode(14, &u, &mut ct[..POLY_BYTES]);
    ct[POLY_BYTES..CPA_PUBLIC_KEY_SIZE].copy_from_slice(rho);
    let mut vc = v;
    poly::compress_vector(3, &mut vc);
    poly::byte_encode(3, &vc, &mut ct[CPA_PUBLIC_KEY_SIZE..]);

    sp.zeroize();
    ep.zeroize();
    epp.zeroize();
}


/// Decrypts a CPA ciphertext with the packed secret `ŝ`, recovering the
/// 32-byte message. Never fails: malformed coefficients are frozen into
/// range and surface later through re-encryption verification.
pub(crate) fn cpa_decrypt(sk: &[u8], ct: &[u8]) -> [u8; SEED_SIZE] {
    debug_assert_eq!(sk.len(), CPA_PRIVATE_KEY_SIZE, "rlwe decrypt: sk length");

    let mut u = [0u16; N];
    poly::byte_decode(14, &ct[..POLY_BYTES], &mut u);
    for c in u.iter_mut() {
        *c = poly::freeze(*c);
    }
    let mut v = [0u16; N];
    poly::byte_decode(3, &ct[CPA_PUBLIC_KEY_SIZE..CPA_CIPHERTEXT_SIZE], &mut v);
    poly::decompress_vector(3, &mut v);

    let mut s = [0u16; N];
    poly::byte_decode(14, sk, &mut s);
    for c in s.iter_mut() {
        *c = poly::freeze(*c);
    }

    // w = v − INTT(ŝ∘û)
    let mut t = poly::pointwise(&s, &u);
    poly::inv_ntt(&mut t);
    let w = poly::poly_sub(&v, &t);

    s.zeroize();
    poly::to_message(&w)
}


/// Checks that every packed public-key coefficient is a canonical
/// residue. Not constant time; runs only at key-import boundaries.
pub(crate) fn public_key_well_formed(pk: &[u8]) -> bool {
    let mut b = [0u16; N];
    poly::byte_decode(14, &pk[..POLY_BYTES], &mut b);
    b.iter().all(|&c| u32::from(c) < poly::Q)
}

/// Range check for a packed CPA secret at key-import boundaries.
pub(crate) fn cpa_private_key_well_formed(sk: &[u8]) -> bool {
    let mut s = [0u16; N];
    poly::byte_decode(14, sk, &mut s);
    s.iter().all(|&c| u32::from(c) < poly::Q)
}
