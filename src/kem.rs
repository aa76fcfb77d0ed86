//! The IND-CCA2 key encapsulation mechanism.
//!
//! A Fujisaki–Okamoto transform over the per-family CPA encryption
//! layers: encapsulation hashes fresh entropy before it can reach the
//! ciphertext (multi-target countermeasure), derives the pre-key and coin
//! from `SHAKE256(m ‖ H(pk))`, and binds the final secret to the
//! ciphertext hash. Decapsulation re-encrypts, compares the full
//! ciphertext in constant time, and substitutes the per-key rejection
//! secret `z` for the pre-key on mismatch, so a forgery yields a
//! pseudorandom secret indistinguishable from success.

use alloc::vec;
use alloc::vec::Vec;
use zeroize::{Zeroize, Zeroizing};

#[cfg(feature = "module-lwe")]
use crate::mlwe;
#[cfg(feature = "ring-lwe")]
use crate::rlwe;
use crate::rng::RngSource;
use crate::util;
use crate::xof;
use crate::{Ciphertext, CryptoError, ParamSet, PrivateKey, PublicKey, SharedSecret, SEED_SIZE};


/// Key material accepted by [`Kem::initialize`]: a public key prepares
/// the instance for encapsulation, a private key for decapsulation.
pub enum KemKey {
    /// Initialize as an encryptor.
    Public(PublicKey),
    /// Initialize as a decryptor.
    Private(PrivateKey),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Encryptor,
    Decryptor,
}


/// The outcome of a decapsulation.
///
/// The shared secret is always present and is already fixed by the time
/// a caller can inspect the result, so consulting the authentication
/// signal cannot influence the constant-time path that produced it.
#[derive(Debug)]
pub struct Decapsulated {
    shared_secret: SharedSecret,
    rejected: bool,
}

impl Decapsulated {
    /// The shared secret, regardless of the authentication outcome
    /// (pure implicit rejection).
    #[must_use]
    pub fn shared_secret(self) -> SharedSecret {
        self.shared_secret
    }

    /// True when re-encryption reproduced the received ciphertext.
    #[must_use]
    pub fn is_authentic(&self) -> bool {
        !self.rejected
    }

    /// The shared secret if the ciphertext authenticated.
    ///
    /// # Errors
    /// `AuthenticationFailure` when re-encryption verification failed;
    /// the implicit-rejection secret is discarded with zeroization.
    pub fn verified(self) -> Result<SharedSecret, CryptoError> {
        if self.rejected {
            Err(CryptoError::AuthenticationFailure)
        } else {
            Ok(self.shared_secret)
        }
    }
}


/// An IND-CCA2 KEM instance bound to one parameter set and one entropy
/// source.
///
/// Construction configures the parameter set; [`initialize`](Kem::initialize)
/// fixes the role from the supplied key kind. [`encapsulate`](Kem::encapsulate)
/// requires an encryptor, [`decapsulate`](Kem::decapsulate) a decryptor;
/// [`generate`](Kem::generate) is accepted in any state and never changes
/// it. Instances are not safe for concurrent mutation; independent
/// instances may run in parallel threads.
pub struct Kem<'a> {
    params: ParamSet,
    rng: RngSource<'a>,
    domain_key: Vec<u8>,
    role: Option<Role>,
    public_key: Option<PublicKey>,
    private_key: Option<PrivateKey>,
}

impl<'a> Kem<'a> {
    /// Creates an instance for `params` drawing entropy from `rng`.
    #[must_use]
    pub fn new(params: ParamSet, rng: RngSource<'a>) -> Self {
        Kem {
            params,
            rng,
            domain_key: Vec::new(),
            role: None,
            public_key: None,
            private_key: None,
        }
    }

    /// The configured parameter set.
    #[must_use]
    pub fn params(&self) -> ParamSet {
        self.params
    }

    /// The instance's formal name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.params.name()
    }

    /// True once a key has been loaded via [`initialize`](Kem::initialize).
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.role.is_some()
    }

    /// Sets the domain key mixed into shared-secret derivation as a
    /// cSHAKE customization string. Empty (the default) selects plain
    /// SHAKE; parties must agree on the value byte-for-byte.
    pub fn set_domain_key(&mut self, key: &[u8]) {
        self.domain_key.zeroize();
        self.domain_key = key.to_vec();
    }

    /// The current domain key.
    #[must_use]
    pub fn domain_key(&self) -> &[u8] {
        &self.domain_key
    }

    /// Generates a fresh key pair for the configured parameter set.
    ///
    /// The private key embeds the public key, its hash, and the
    /// implicit-rejection secret `z`. The instance state is unchanged.
    ///
    /// # Errors
    /// `EntropyUnavailable` when the random provider fails; scratch
    /// material is zeroized before returning.
    pub fn generate(&mut self) -> Result<(PublicKey, PrivateKey), CryptoError> {
        let params = self.params;
        let mut d = Zeroizing::new([0u8; SEED_SIZE]);
        self.rng
            .as_dyn()
            .try_fill_bytes(d.as_mut())
            .map_err(|_| CryptoError::EntropyUnavailable)?;

        let mut pk = vec![0u8; params.public_key_size()];
        let mut sk = vec![0u8; params.private_key_size()];
        let pk_at = params.cpa_private_key_size();
        let h_at = pk_at + params.public_key_size();
        let z_at = h_at + SEED_SIZE;

        cpa_key_gen(params, &d, &mut pk, &mut sk[..pk_at]);

        // sk ← sk_cpa ‖ pk ‖ H(pk) ‖ z
        sk[pk_at..h_at].copy_from_slice(&pk);
        let h_pk = xof::h(&pk);
        sk[h_at..z_at].copy_from_slice(&h_pk);
        if self.rng.as_dyn().try_fill_bytes(&mut sk[z_at..]).is_err() {
            sk.zeroize();
            return Err(CryptoError::EntropyUnavailable);
        }

        Ok((
            PublicKey::from_parts(params, pk),
            PrivateKey::from_parts(params, sk),
        ))
    }

    /// Loads a key, fixing the instance role by the key kind.
    ///
    /// # Errors
    /// `InvalidKey` when the key's parameter set disagrees with the
    /// instance's.
    pub fn initialize(&mut self, key: KemKey) -> Result<(), CryptoError> {
        match key {
            KemKey::Public(pk) => {
                if pk.params() != self.params {
                    return Err(CryptoError::InvalidKey);
                }
                self.public_key = Some(pk);
                self.private_key = None;
                self.role = Some(Role::Encryptor);
            }
            KemKey::Private(sk) => {
                if sk.params() != self.params {
                    return Err(CryptoError::InvalidKey);
                }
                self.private_key = Some(sk);
                self.public_key = None;
                self.role = Some(Role::Decryptor);
            }
        }
        Ok(())
    }

    /// Produces a ciphertext and a `shared_secret_len`-byte shared
    /// secret for the loaded public key.
    ///
    /// # Errors
    /// `InvalidParameter` for a zero-length secret request,
    /// `InvalidState` when no public key is loaded, and
    /// `EntropyUnavailable` when the random provider fails.
    pub fn encapsulate(
        &mut self, shared_secret_len: usize,
    ) -> Result<(Ciphertext, SharedSecret), CryptoError> {
        if shared_secret_len == 0 {
            return Err(CryptoError::InvalidParameter);
        }
        if self.role != Some(Role::Encryptor) {
            return Err(CryptoError::InvalidState);
        }

        // m ← SHAKE256(m'): raw generator output never reaches the
        // ciphertext (multi-target countermeasure)
        let mut m = Zeroizing::new([0u8; SEED_SIZE]);
        {
            let mut m_prime = Zeroizing::new([0u8; SEED_SIZE]);
            self.rng
                .as_dyn()
                .try_fill_bytes(m_prime.as_mut())
                .map_err(|_| CryptoError::EntropyUnavailable)?;
            xof::shake256_into(&[m_prime.as_ref()], m.as_mut());
        }

        let params = self.params;
        let pk = self.public_key.as_ref().ok_or(CryptoError::InvalidState)?;

        // (K̄, r[, d]) ← SHAKE256(m ‖ H(pk))
        let h_pk = xof::h(pk.as_bytes());
        let mut kr = Zeroizing::new(vec![0u8; params.coin_buffer_size()]);
        xof::shake256_into(&[m.as_ref(), &h_pk], &mut kr);

        let mut ct = vec![0u8; params.ciphertext_size()];
        let cpa_len = params.cpa_ciphertext_size();
        {
            let mut coin = Zeroizing::new([0u8; SEED_SIZE]);
            coin.copy_from_slice(&kr[SEED_SIZE..2 * SEED_SIZE]);
            cpa_encrypt(params, pk.as_bytes(), &m, &coin, &mut ct[..cpa_len]);
        }
        // Targhi-Unruh tail for the ring family
        if ct.len() > cpa_len {
            ct[cpa_len..].copy_from_slice(&kr[2 * SEED_SIZE..]);
        }

        let secret = derive_shared_secret(
            &kr[..SEED_SIZE],
            &ct,
            &self.domain_key,
            shared_secret_len,
        );
        Ok((Ciphertext::from_parts(params, ct), secret))
    }

    /// Recovers a `shared_secret_len`-byte shared secret from a
    /// ciphertext with the loaded private key.
    ///
    /// Always computes a secret: on re-encryption mismatch the returned
    /// [`Decapsulated`] carries the implicit-rejection secret derived
    /// from `z`, and its verification accessors report the failure. The
    /// comparison and substitution never branch on secret data.
    ///
    /// # Errors
    /// `InvalidParameter` for a zero-length secret request or a
    /// ciphertext from another parameter set, and `InvalidState` when no
    /// private key is loaded.
    pub fn decapsulate(
        &self, ct: &Ciphertext, shared_secret_len: usize,
    ) -> Result<Decapsulated, CryptoError> {
        if shared_secret_len == 0 || ct.params() != self.params {
            return Err(CryptoError::InvalidParameter);
        }
        if self.role != Some(Role::Decryptor) {
            return Err(CryptoError::InvalidState);
        }
        let sk = self.private_key.as_ref().ok_or(CryptoError::InvalidState)?;

        let params = self.params;
        let sk_bytes = sk.as_bytes();
        let pk_at = params.cpa_private_key_size();
        let h_at = pk_at + params.public_key_size();
        let z_at = h_at + SEED_SIZE;
        let cpa_sk = &sk_bytes[..pk_at];
        let pk = &sk_bytes[pk_at..h_at];
        let h = &sk_bytes[h_at..z_at];
        let z = &sk_bytes[z_at..];

        let m = Zeroizing::new(cpa_decrypt(params, cpa_sk, ct.as_bytes()));

        // (K̄', r'[, d']) ← SHAKE256(m' ‖ h), with the stored hash of pk
        let mut kr = Zeroizing::new(vec![0u8; params.coin_buffer_size()]);
        xof::shake256_into(&[m.as_ref(), h], &mut kr);

        // re-encrypt with the derived coin
        let mut cmp = vec![0u8; params.ciphertext_size()];
        let cpa_len = params.cpa_ciphertext_size();
        {
            let mut coin = Zeroizing::new([0u8; SEED_SIZE]);
            coin.copy_from_slice(&kr[SEED_SIZE..2 * SEED_SIZE]);
            cpa_encrypt(params, pk, &m, &coin, &mut cmp[..cpa_len]);
        }
        if cmp.len() > cpa_len {
            cmp[cpa_len..].copy_from_slice(&kr[2 * SEED_SIZE..]);
        }

        // full-width verify, then K̄ ← z on mismatch
        let fail = util::ct_differs(ct.as_bytes(), &cmp);
        let mut k_bar = Zeroizing::new([0u8; SEED_SIZE]);
        k_bar.copy_from_slice(&kr[..SEED_SIZE]);
        util::ct_select(k_bar.as_mut(), z, fail);

        let secret = derive_shared_secret(
            k_bar.as_ref(),
            ct.as_bytes(),
            &self.domain_key,
            shared_secret_len,
        );
        Ok(Decapsulated { shared_secret: secret, rejected: fail.into() })
    }
}

impl Drop for Kem<'_> {
    fn drop(&mut self) {
        self.domain_key.zeroize();
    }
}


// K = SHAKE256(K̄ ‖ SHAKE256(c, 32), customization = domain key)
fn derive_shared_secret(
    k_bar: &[u8], ct: &[u8], domain_key: &[u8], len: usize,
) -> SharedSecret {
    let h_ct = xof::h(ct);
    let mut out = vec![0u8; len];
    xof::shake256_custom_into(&[k_bar, &h_ct], domain_key, &mut out);
    SharedSecret::new(out)
}


// The four dispatchers below branch once on the parameter-set tag and
// call into monomorphic per-family kernels.

fn cpa_key_gen(params: ParamSet, d: &[u8; SEED_SIZE], pk: &mut [u8], sk: &mut [u8]) {
    match params {
        #[cfg(feature = "ring-lwe")]
        ParamSet::RlweQ12289N1024 => rlwe::cpa_key_gen(d, pk, sk),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K2 => mlwe::cpa_key_gen::<2>(d, pk, sk),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K3 => mlwe::cpa_key_gen::<3>(d, pk, sk),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K4 => mlwe::cpa_key_gen::<4>(d, pk, sk),
    }
}

fn cpa_encrypt(
    params: ParamSet, pk: &[u8], m: &[u8; SEED_SIZE], coin: &[u8; SEED_SIZE], ct: &mut [u8],
) {
    match params {
        #[cfg(feature = "ring-lwe")]
        ParamSet::RlweQ12289N1024 => rlwe::cpa_encrypt(pk, m, coin, ct),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K2 => mlwe::cpa_encrypt::<2>(pk, m, coin, ct),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K3 => mlwe::cpa_encrypt::<3>(pk, m, coin, ct),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K4 => mlwe::cpa_encrypt::<4>(pk, m, coin, ct),
    }
}

fn cpa_decrypt(params: ParamSet, sk: &[u8], ct: &[u8]) -> [u8; SEED_SIZE] {
    let cpa_ct = &ct[..params.cpa_ciphertext_size()];
    match params {
        #[cfg(feature = "ring-lwe")]
        ParamSet::RlweQ12289N1024 => rlwe::cpa_decrypt(sk, cpa_ct),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K2 => mlwe::cpa_decrypt::<2>(sk, cpa_ct),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K3 => mlwe::cpa_decrypt::<3>(sk, cpa_ct),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K4 => mlwe::cpa_decrypt::<4>(sk, cpa_ct),
    }
}

pub(crate) fn public_key_well_formed(params: ParamSet, bytes: &[u8]) -> bool {
    match params {
        #[cfg(feature = "ring-lwe")]
        ParamSet::RlweQ12289N1024 => rlwe::public_key_well_formed(bytes),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K2 => mlwe::public_key_well_formed::<2>(bytes),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K3 => mlwe::public_key_well_formed::<3>(bytes),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K4 => mlwe::public_key_well_formed::<4>(bytes),
    }
}

pub(crate) fn cpa_private_key_well_formed(params: ParamSet, bytes: &[u8]) -> bool {
    match params {
        #[cfg(feature = "ring-lwe")]
        ParamSet::RlweQ12289N1024 => rlwe::cpa_private_key_well_formed(bytes),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K2 => mlwe::cpa_private_key_well_formed::<2>(bytes),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K3 => mlwe::cpa_private_key_well_formed::<3>(bytes),
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K4 => mlwe::cpa_private_key_well_formed::<4>(bytes),
    }
}


#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::boxed::Box;

    use super::*;
    use crate::rng::ShakeRng;

    fn kem_with_seed(params: ParamSet, seed: &[u8]) -> Kem<'static> {
        Kem::new(params, RngSource::Owned(Box::new(ShakeRng::new(seed))))
    }

    #[cfg(feature = "module-lwe")]
    #[test]
    fn test_state_machine_guards() {
        let mut kem = kem_with_seed(ParamSet::MlweQ7681N256K2, b"state machine");
        assert!(!kem.is_initialized());
        assert_eq!(kem.encapsulate(32).unwrap_err(), CryptoError::InvalidState);

        let (pk, sk) = kem.generate().unwrap();
        assert!(!kem.is_initialized());

        kem.initialize(KemKey::Public(pk)).unwrap();
        assert!(kem.is_initialized());
        let (ct, _) = kem.encapsulate(32).unwrap();
        assert_eq!(
            kem.decapsulate(&ct, 32).unwrap_err(),
            CryptoError::InvalidState
        );

        kem.initialize(KemKey::Private(sk)).unwrap();
        assert_eq!(kem.encapsulate(32).unwrap_err(), CryptoError::InvalidState);
        assert!(kem.decapsulate(&ct, 32).is_ok());

        assert_eq!(kem.decapsulate(&ct, 0).unwrap_err(), CryptoError::InvalidParameter);
    }

    #[cfg(all(feature = "ring-lwe", feature = "module-lwe"))]
    #[test]
    fn test_family_mismatch_is_rejected() {
        let mut rlwe_kem = kem_with_seed(ParamSet::RlweQ12289N1024, b"mismatch");
        let (pk, _) = rlwe_kem.generate().unwrap();

        let mut mlwe_kem = kem_with_seed(ParamSet::MlweQ7681N256K3, b"mismatch 2");
        assert_eq!(
            mlwe_kem.initialize(KemKey::Public(pk)).unwrap_err(),
            CryptoError::InvalidKey
        );
    }

    #[cfg(feature = "module-lwe")]
    #[test]
    fn test_generate_is_usable_after_initialize() {
        let mut kem = kem_with_seed(ParamSet::MlweQ7681N256K4, b"regen");
        let (pk, _) = kem.generate().unwrap();
        kem.initialize(KemKey::Public(pk)).unwrap();
        assert!(kem.generate().is_ok());
        assert!(kem.is_initialized());
    }
}
