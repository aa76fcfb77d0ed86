#![no_std]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]

//! Post-quantum key encapsulation over two lattice parameter families: a
//! Ring-LWE construction at q = 12289 with 1024 coefficients, and a
//! Module-LWE construction at q = 7681 with 256 coefficients and rank
//! k ∈ {2, 3, 4}.
//!
//! Both families share one symmetric core: SHAKE-128/256 drive seed
//! expansion, uniform and binomial polynomial sampling, coin derivation,
//! and the final shared-secret KDF, which accepts an optional caller
//! domain key as a cSHAKE customization string. The CPA-secure encryption
//! layer is lifted to an IND-CCA2 KEM with a Fujisaki–Okamoto transform:
//! decapsulation re-encrypts, compares ciphertexts in constant time, and
//! substitutes a per-key implicit-rejection secret on mismatch.
//!
//! ```
//! use lattice_kem::{Kem, KemKey, ParamSet, RngSource, ShakeRng};
//!
//! # fn main() -> Result<(), lattice_kem::CryptoError> {
//! # #[cfg(feature = "module-lwe")] {
//! let rng = RngSource::Owned(Box::new(ShakeRng::new(b"doc example seed")));
//! let mut bob = Kem::new(ParamSet::MlweQ7681N256K3, rng);
//! let (pk, sk) = bob.generate()?;
//!
//! let rng = RngSource::Owned(Box::new(ShakeRng::new(b"another seed")));
//! let mut alice = Kem::new(ParamSet::MlweQ7681N256K3, rng);
//! alice.initialize(KemKey::Public(pk))?;
//! let (ct, ss_alice) = alice.encapsulate(32)?;
//!
//! bob.initialize(KemKey::Private(sk))?;
//! let ss_bob = bob.decapsulate(&ct, 32)?.verified()?;
//! assert_eq!(ss_alice, ss_bob);
//! # }
//! # Ok(()) }
//! ```

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod kem;
#[cfg(feature = "module-lwe")]
mod mlwe;
#[cfg(feature = "ring-lwe")]
mod poly1024;
#[cfg(feature = "module-lwe")]
mod poly256;
#[cfg(feature = "ring-lwe")]
mod rlwe;
mod rng;
mod util;
mod xof;

pub use crate::kem::{Decapsulated, Kem, KemKey};
pub use crate::rng::{RngSource, ShakeRng};

/// Length in bytes of every seed handled by the ciphers (public matrix
/// seeds, noise seeds, implicit-rejection secrets, stored key hashes).
pub const SEED_SIZE: usize = 32;

/// Default shared-secret length in bytes; callers may request any nonzero
/// length at encapsulation/decapsulation time.
pub const SHARED_SECRET_SIZE: usize = 32;


/// The lattice parameter families supported by [`Kem`].
///
/// The choice fixes every derived quantity: modulus, polynomial degree,
/// module rank, and all serialized byte sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamSet {
    /// Ring-LWE, q = 12289, n = 1024.
    #[cfg(feature = "ring-lwe")]
    RlweQ12289N1024,
    /// Module-LWE, q = 7681, n = 256, rank 2.
    #[cfg(feature = "module-lwe")]
    MlweQ7681N256K2,
    /// Module-LWE, q = 7681, n = 256, rank 3.
    #[cfg(feature = "module-lwe")]
    MlweQ7681N256K3,
    /// Module-LWE, q = 7681, n = 256, rank 4.
    #[cfg(feature = "module-lwe")]
    MlweQ7681N256K4,
}

impl ParamSet {
    /// The parameter set's formal name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "ring-lwe")]
            ParamSet::RlweQ12289N1024 => "RingLWE-Q12289N1024",
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K2 => "ModuleLWE-Q7681N256K2",
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K3 => "ModuleLWE-Q7681N256K3",
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K4 => "ModuleLWE-Q7681N256K4",
        }
    }

    /// Serialized public-key length in bytes.
    #[must_use]
    pub fn public_key_size(self) -> usize {
        match self {
            #[cfg(feature = "ring-lwe")]
            ParamSet::RlweQ12289N1024 => rlwe::PUBLIC_KEY_SIZE,
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K2 => mlwe::public_key_size(2),
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K3 => mlwe::public_key_size(3),
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K4 => mlwe::public_key_size(4),
        }
    }

    /// Serialized private-key length in bytes.
    #[must_use]
    pub fn private_key_size(self) -> usize {
        match self {
            #[cfg(feature = "ring-lwe")]
            ParamSet::RlweQ12289N1024 => rlwe::PRIVATE_KEY_SIZE,
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K2 => mlwe::private_key_size(2),
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K3 => mlwe::private_key_size(3),
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K4 => mlwe::private_key_size(4),
        }
    }

    /// Serialized ciphertext length in bytes.
    #[must_use]
    pub fn ciphertext_size(self) -> usize {
        match self {
            #[cfg(feature = "ring-lwe")]
            ParamSet::RlweQ12289N1024 => rlwe::CIPHERTEXT_SIZE,
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K2 => mlwe::ciphertext_size(2),
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K3 => mlwe::ciphertext_size(3),
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K4 => mlwe::ciphertext_size(4),
        }
    }

    /// CPA private-key length; also the offset of the embedded public key
    /// inside a serialized private key.
    #[must_use]
    pub fn cpa_private_key_size(self) -> usize {
        match self {
            #[cfg(feature = "ring-lwe")]
            ParamSet::RlweQ12289N1024 => rlwe::CPA_PRIVATE_KEY_SIZE,
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K2 => mlwe::cpa_private_key_size(2),
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K3 => mlwe::cpa_private_key_size(3),
            #[cfg(feature = "module-lwe")]
            ParamSet::MlweQ7681N256K4 => mlwe::cpa_private_key_size(4),
        }
    }

    /// CPA ciphertext length; the Ring-LWE family appends its Targhi–Unruh
    /// hash after this offset.
    #[allow(unreachable_patterns)]
    pub(crate) fn cpa_ciphertext_size(self) -> usize {
        match self {
            #[cfg(feature = "ring-lwe")]
            ParamSet::RlweQ12289N1024 => rlwe::CPA_CIPHERTEXT_SIZE,
            _ => self.ciphertext_size(),
        }
    }

    /// Length of the coin buffer expanded from `SHAKE256(m ‖ H(pk))`: two
    /// 32-byte halves, plus a third for the Ring-LWE Targhi–Unruh hash.
    #[allow(unreachable_patterns)]
    pub(crate) fn coin_buffer_size(self) -> usize {
        match self {
            #[cfg(feature = "ring-lwe")]
            ParamSet::RlweQ12289N1024 => 3 * SEED_SIZE,
            _ => 2 * SEED_SIZE,
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}


/// Error taxonomy for every fallible operation in the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// A zero-length shared secret was requested, or a byte blob has a
    /// length no parameter set produces.
    InvalidParameter,
    /// The operation is not permitted by the instance's current state.
    InvalidState,
    /// The key does not match the cipher family or parameter set, or its
    /// internal structure failed validation.
    InvalidKey,
    /// The random provider could not produce the requested bytes.
    EntropyUnavailable,
    /// Ciphertext verification failed during decapsulation; the returned
    /// shared secret is the implicit-rejection secret.
    AuthenticationFailure,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CryptoError::InvalidParameter => "invalid parameter selection",
            CryptoError::InvalidState => "operation not valid in the current state",
            CryptoError::InvalidKey => "key does not match the cipher configuration",
            CryptoError::EntropyUnavailable => "the random provider failed to produce seed material",
            CryptoError::AuthenticationFailure => "ciphertext authentication failed",
        })
    }
}


/// The symmetric key output of encapsulation and decapsulation.
///
/// Zeroized on drop; equality comparison runs over the full length
/// without early exit.
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        SharedSecret(bytes)
    }

    /// Borrows the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Copies the secret out; the original is zeroized when dropped.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }

    /// Length of the secret in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the secret is empty (never produced by this crate).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Conservative (constant-time) paranoia...
impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        let mut diff = 0u8;
        for i in 0..self.0.len() {
            diff |= self.0[i] ^ other.0[i];
        }
        diff == 0
    }
}

impl Eq for SharedSecret {}


/// A public (encapsulation) key: packed polynomial(s) followed by the
/// 32-byte public matrix seed. Immutable after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    params: ParamSet,
    bytes: Vec<u8>,
}

impl PublicKey {
    pub(crate) fn from_parts(params: ParamSet, bytes: Vec<u8>) -> Self {
        PublicKey { params, bytes }
    }

    /// Rebuilds a public key from its serialized form, validating the
    /// length and that every packed coefficient is a canonical residue.
    ///
    /// # Errors
    /// `InvalidKey` when the length does not match the parameter set or a
    /// coefficient is out of range.
    pub fn try_from_bytes(params: ParamSet, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != params.public_key_size() || !kem::public_key_well_formed(params, bytes) {
            return Err(CryptoError::InvalidKey);
        }
        Ok(PublicKey { params, bytes: bytes.to_vec() })
    }

    /// The parameter set this key belongs to.
    #[must_use]
    pub fn params(&self) -> ParamSet {
        self.params
    }

    /// Borrows the serialized key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the key into its serialized form.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}


/// A private (decapsulation) key: the CPA secret polynomial(s), a
/// byte-identical copy of the public key, the 32-byte public-key hash,
/// and the 32-byte implicit-rejection secret `z`. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    #[zeroize(skip)]
    params: ParamSet,
    bytes: Vec<u8>,
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("params", &self.params)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

impl PrivateKey {
    pub(crate) fn from_parts(params: ParamSet, bytes: Vec<u8>) -> Self {
        PrivateKey { params, bytes }
    }

    /// Rebuilds a private key from its serialized form.
    ///
    /// Validates the length, the secret and embedded public polynomial
    /// ranges, and that the stored public-key hash matches a fresh hash
    /// of the embedded public key.
    ///
    /// # Errors
    /// `InvalidKey` on any structural mismatch.
    pub fn try_from_bytes(params: ParamSet, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != params.private_key_size() {
            return Err(CryptoError::InvalidKey);
        }
        let pk_at = params.cpa_private_key_size();
        let h_at = pk_at + params.public_key_size();
        if !kem::cpa_private_key_well_formed(params, &bytes[..pk_at])
            || !kem::public_key_well_formed(params, &bytes[pk_at..h_at])
        {
            return Err(CryptoError::InvalidKey);
        }
        let rehash = xof::h(&bytes[pk_at..h_at]);
        if rehash != bytes[h_at..h_at + SEED_SIZE] {
            return Err(CryptoError::InvalidKey);
        }
        Ok(PrivateKey { params, bytes: bytes.to_vec() })
    }

    /// The parameter set this key belongs to.
    #[must_use]
    pub fn params(&self) -> ParamSet {
        self.params
    }

    /// Borrows the serialized key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the serialized key out; the original is zeroized on drop.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}


/// An opaque ciphertext of the fixed length dictated by the parameter
/// set. Ciphertexts are not secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    params: ParamSet,
    bytes: Vec<u8>,
}

impl Ciphertext {
    pub(crate) fn from_parts(params: ParamSet, bytes: Vec<u8>) -> Self {
        Ciphertext { params, bytes }
    }

    /// Rebuilds a ciphertext from its serialized form.
    ///
    /// # Errors
    /// `InvalidParameter` when the length does not match the parameter
    /// set. Content is never inspected; a forged ciphertext surfaces only
    /// through implicit rejection at decapsulation.
    pub fn try_from_bytes(params: ParamSet, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != params.ciphertext_size() {
            return Err(CryptoError::InvalidParameter);
        }
        Ok(Ciphertext { params, bytes: bytes.to_vec() })
    }

    /// The parameter set this ciphertext belongs to.
    #[must_use]
    pub fn params(&self) -> ParamSet {
        self.params
    }

    /// Borrows the serialized ciphertext.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the ciphertext into its serialized form.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
