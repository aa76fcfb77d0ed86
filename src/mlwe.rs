//! CPA-secure public-key encryption over the Module-LWE parameter set
//! q = 7681, n = 256, with rank k ∈ {2, 3, 4} fixed by a const generic.
//!
//! The matrix `Â` is expanded cell by cell from `SHAKE128(ρ ‖ i ‖ j)`;
//! public and secret vectors are packed at 13 bits per coefficient, the
//! ciphertext components at 11 (u) and 3 (v) bits after compression.

use zeroize::{Zeroize, Zeroizing};

use crate::poly256 as poly;
use crate::poly256::{Poly, N};
use crate::xof;
use crate::SEED_SIZE;

pub(crate) const POLY_BYTES: usize = 13 * N / 8; // 416
pub(crate) const U_BYTES: usize = 11 * N / 8; // 352
pub(crate) const V_BYTES: usize = 3 * N / 8; // 96

pub(crate) const fn public_key_size(k: usize) -> usize {
    k * POLY_BYTES + SEED_SIZE
}

pub(crate) const fn cpa_private_key_size(k: usize) -> usize {
    k * POLY_BYTES
}

pub(crate) const fn ciphertext_size(k: usize) -> usize {
    k * U_BYTES + V_BYTES
}

pub(crate) const fn private_key_size(k: usize) -> usize {
    cpa_private_key_size(k) + public_key_size(k) + 2 * SEED_SIZE
}

// Centered-binomial parameter for each module rank.
const fn cbd_eta(k: usize) -> usize {
    match k {
        2 => 5,
        3 => 4,
        _ => 3,
    }
}

const ZERO: Poly = [0u16; N];


// Â[i][j] ← SampleUniform(SHAKE128(ρ ‖ i ‖ j))
#[allow(clippy::cast_possible_truncation)]
fn expand_matrix<const K: usize>(rho: &[u8; SEED_SIZE]) -> [[Poly; K]; K] {
    core::array::from_fn(|i| {
        core::array::from_fn(|j| {
            poly::uniform(xof::shake128(&[rho, &[i as u8], &[j as u8]]))
        })
    })
}

fn add_vecs<const K: usize>(a: &[Poly; K], b: &[Poly; K]) -> [Poly; K] {
    core::array::from_fn(|i| poly::poly_add(&a[i], &b[i]))
}

// ŵ = Â ∘ û
fn mul_mat_vec<const K: usize>(a: &[[Poly; K]; K], u: &[Poly; K]) -> [Poly; K] {
    let mut w = [ZERO; K];
    for i in 0..K {
        for j in 0..K {
            let t = poly::pointwise(&a[i][j], &u[j]);
            w[i] = poly::poly_add(&w[i], &t);
        }
    }
    w
}

// ŷ = Âᵀ ∘ û; indices swapped relative to mul_mat_vec
fn mul_mat_t_vec<const K: usize>(a: &[[Poly; K]; K], u: &[Poly; K]) -> [Poly; K] {
    let mut y = [ZERO; K];
    for i in 0..K {
        for j in 0..K {
            let t = poly::pointwise(&a[j][i], &u[j]);
            y[i] = poly::poly_add(&y[i], &t);
        }
    }
    y
}

// ẑ = ûᵀ ∘ v̂
fn dot_prod<const K: usize>(u: &[Poly; K], v: &[Poly; K]) -> Poly {
    let mut z = ZERO;
    for j in 0..K {
        let t = poly::pointwise(&u[j], &v[j]);
        z = poly::poly_add(&z, &t);
    }
    z
}


/// Expands seed `d`, samples `s` and `e` from ψ_eta with sequential
/// nonces, and writes `pack(t̂) ‖ ρ` and `pack(ŝ)`.
pub(crate) fn cpa_key_gen<const K: usize>(d: &[u8; SEED_SIZE], pk: &mut [u8], sk: &mut [u8]) {
    debug_assert_eq!(pk.len(), public_key_size(K), "mlwe keygen: pk length");
    debug_assert_eq!(sk.len(), cpa_private_key_size(K), "mlwe keygen: sk length");

    // (ρ, σ) ← SHAKE256(d, 64)
    let mut expanded = Zeroizing::new([0u8; 2 * SEED_SIZE]);
    xof::shake256_into(&[d], expanded.as_mut());
    let rho: [u8; SEED_SIZE] = expanded[..SEED_SIZE].try_into().unwrap();
    let sigma: [u8; SEED_SIZE] = expanded[SEED_SIZE..].try_into().unwrap();

    let eta = cbd_eta(K);
    let a = expand_matrix::<K>(&rho);

    let mut nonce = 0u8;
    let mut s: [Poly; K] = core::array::from_fn(|_| {
        let x = poly::sample_noise(&sigma, nonce, eta);
        nonce += 1;
        x
    });
    let mut e: [Poly; K] = core::array::from_fn(|_| {
        let x = poly::sample_noise(&sigma, nonce, eta);
        nonce += 1;
        x
    });
    for p in s.iter_mut() {
        poly::ntt(p);
    }
    for p in e.iter_mut() {
        poly::ntt(p);
    }

    // t̂ = Â ∘ ŝ + ê
    let t = add_vecs(&mul_mat_vec(&a, &s), &e);

    for (i, chunk) in pk.chunks_mut(POLY_BYTES).enumerate().take(K) {
        poly::byte_encode(13, &t[i], chunk);
    }
    pk[K * POLY_BYTES..].copy_from_slice(&rho);
    for (i, chunk) in sk.chunks_mut(POLY_BYTES).enumerate() {
        poly::byte_encode(13, &s[i], chunk);
    }

    for p in s.iter_mut() {
        p.zeroize();
    }
    for p in e.iter_mut() {
        p.zeroize();
    }
}


/// Encrypts the 32-byte message `m` under `pk` with coin `r`, writing
/// `pack(compress₁₁(u)) ‖ pack(compress₃(v))`.
pub(crate) fn cpa_encrypt<const K: usize>(
    pk: &[u8], m: &[u8; SEED_SIZE], r: &[u8; SEED_SIZE], ct: &mut [u8],
) {
    debug_assert_eq!(pk.len(), public_key_size(K), "mlwe encrypt: pk length");
    debug_assert_eq!(ct.len(), ciphertext_size(K), "mlwe encrypt: ct length");

    let mut t = [ZERO; K];
    for (i, chunk) in pk.chunks(POLY_BYTES).enumerate().take(K) {
        poly::byte_decode(13, chunk, &mut t[i]);
    }
    let rho: &[u8; SEED_SIZE] = pk[K * POLY_BYTES..].try_into().unwrap();
    let a = expand_matrix::<K>(rho);

    let eta = cbd_eta(K);
    let mut nonce = 0u8;
    let mut y: [Poly; K] = core::array::from_fn(|_| {
        let x = poly::sample_noise(r, nonce, eta);
        nonce += 1;
        x
    });
    let mut e1: [Poly; K] = core::array::from_fn(|_| {
        let x = poly::sample_noise(r, nonce, eta);
        nonce += 1;
        x
    });
    let mut e2 = poly::sample_noise(r, nonce, eta);

    for p in y.iter_mut() {
        poly::ntt(p);
    }

    // u = INTT(Âᵀ ∘ ŷ) + e₁
    let mut u = mul_mat_t_vec(&a, &y);
    for p in u.iter_mut() {
        poly::inv_ntt(p);
    }
    let mut u = add_vecs(&u, &e1);

    // v = INTT(t̂ᵀ ∘ ŷ) + e₂ + Decompress₁(m)
    let mut v = dot_prod(&t, &y);
    poly::inv_ntt(&mut v);
    let mut mu = ZERO;
    poly::byte_decode(1, m, &mut mu);
    poly::decompress_vector(1, &mut mu);
    let mut v = poly::poly_add(&poly::poly_add(&v, &e2), &mu);

    for (i, chunk) in ct.chunks_mut(U_BYTES).enumerate().take(K) {
        poly::compress_vector(11, &mut u[i]);
        poly::byte_encode(11, &u[i], chunk);
    }
    poly::compress_vector(3, &mut v);
    poly::byte_encode(3, &v, &mut ct[K * U_BYTES..]);

    for p in y.iter_mut() {
        p.zeroize();
    }
    for p in e1.iter_mut() {
        p.zeroize();
    }
    e2.zeroize();
}


/// Decrypts a CPA ciphertext with the packed secret vector `ŝ`. Never
/// fails: every decoded value decompresses into range.
pub(crate) fn cpa_decrypt<const K: usize>(sk: &[u8], ct: &[u8]) -> [u8; SEED_SIZE] {
    debug_assert_eq!(sk.len(), cpa_private_key_size(K), "mlwe decrypt: sk length");
    debug_assert_eq!(ct.len(), ciphertext_size(K), "mlwe decrypt: ct length");

    let mut u = [ZERO; K];
    for (i, chunk) in ct.chunks(U_BYTES).enumerate().take(K) {
        poly::byte_decode(11, chunk, &mut u[i]);
        poly::decompress_vector(11, &mut u[i]);
    }
    let mut v = ZERO;
    poly::byte_decode(3, &ct[K * U_BYTES..], &mut v);
    poly::decompress_vector(3, &mut v);

    let mut s = [ZERO; K];
    for (i, chunk) in sk.chunks(POLY_BYTES).enumerate() {
        poly::byte_decode(13, chunk, &mut s[i]);
        for c in s[i].iter_mut() {
            *c = poly::freeze(*c);
        }
    }

    // w = v − INTT(ŝᵀ ∘ NTT(u))
    for p in u.iter_mut() {
        poly::ntt(p);
    }
    let mut w = dot_prod(&s, &u);
    poly::inv_ntt(&mut w);
    let mut w = poly::poly_sub(&v, &w);

    poly::compress_vector(1, &mut w);
    let mut msg = [0u8; SEED_SIZE];
    poly::byte_encode(1, &w, &mut msg);

    for p in s.iter_mut() {
        p.zeroize();
    }
    msg
}


/// Range check over every packed public polynomial at key-import
/// boundaries. Not constant time.
pub(crate) fn public_key_well_formed<const K: usize>(pk: &[u8]) -> bool {
    let mut p = ZERO;
    for chunk in pk[..K * POLY_BYTES].chunks(POLY_BYTES) {
        poly::byte_decode(13, chunk, &mut p);
        if !p.iter().all(|&c| u32::from(c) < poly::Q) {
            return false;
        }
    }
    true
}

/// Range check for a packed CPA secret vector at key-import boundaries.
pub(crate) fn cpa_private_key_well_formed<const K: usize>(sk: &[u8]) -> bool {
    let mut p = ZERO;
    for chunk in sk.chunks(POLY_BYTES) {
        poly::byte_decode(13, chunk, &mut p);
        if !p.iter().all(|&c| u32::from(c) < poly::Q) {
            return false;
        }
    }
    true
}


#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::vec;

    use super::*;

    fn round_trip<const K: usize>() {
        let d = [K as u8; SEED_SIZE];
        let mut pk = vec![0u8; public_key_size(K)];
        let mut sk = vec![0u8; cpa_private_key_size(K)];
        cpa_key_gen::<K>(&d, &mut pk, &mut sk);
        assert!(public_key_well_formed::<K>(&pk));
        assert!(cpa_private_key_well_formed::<K>(&sk));

        let m = *b"a fixed thirty-two byte message!";
        let r = [0x5Au8; SEED_SIZE];
        let mut ct = vec![0u8; ciphertext_size(K)];
        cpa_encrypt::<K>(&pk, &m, &r, &mut ct);
        assert_eq!(cpa_decrypt::<K>(&sk, &ct), m);
    }

    #[test]
    fn test_cpa_round_trip_k2() {
        round_trip::<2>();
    }

    #[test]
    fn test_cpa_round_trip_k3() {
        round_trip::<3>();
    }

    #[test]
    fn test_cpa_round_trip_k4() {
        round_trip::<4>();
    }

    #[test]
    fn test_matrix_is_seed_and_index_bound() {
        let rho = [6u8; SEED_SIZE];
        let a = expand_matrix::<2>(&rho);
        let b = expand_matrix::<2>(&rho);
        assert_eq!(a[0][0], b[0][0]);
        assert_ne!(a[0][0], a[0][1]);
        assert_ne!(a[0][1], a[1][0]);
    }
}
