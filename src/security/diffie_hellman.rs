//! Finite-field Diffie-Hellman key agreement.
//!
//! Each [`KeyAgreement`] holds one party's side of a single exchange: a
//! private exponent drawn at construction, the public value `g^x mod p`,
//! and, once the peer's value has been validated, the shared secret and
//! the SHA-256 session key derived from it.
//!
//! KNOWN LIMITATION: exponentiation uses `num-bigint-dig`'s `modpow`, which
//! is not constant-time. The private exponent may leak through timing to an
//! observer who can measure many exchanges. Validation protects against
//! invalid-value attacks but not against a man in the middle; authenticate
//! the public values at a higher layer.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use num_bigint_dig::BigUint;
use zeroize::Zeroizing;

use super::entropy::{random_exponent, system_entropy, EntropySource};
use super::modp_group::{ModpGroup, Rfc3526Group};
use super::session_key::{SessionKey, SharedSecret};
use crate::error::{Error, Result};

/// Lower bound on private exponent entropy, matching a 256-bit session key.
pub const MIN_EXPONENT_BITS: usize = 256;

/// Default private exponent size. RFC 3526 suggests 540+ bits for group 17.
pub const DEFAULT_EXPONENT_BITS: usize = 576;

/// Configuration for a key agreement.
#[derive(Debug, Clone)]
pub struct KeyAgreementConfig {
    /// Group parameters shared by both parties.
    pub group: Arc<ModpGroup>,
    /// Number of random bits in the private exponent.
    pub exponent_bits: usize,
}

impl Default for KeyAgreementConfig {
    fn default() -> Self {
        KeyAgreementConfig {
            group: ModpGroup::rfc3526(Rfc3526Group::Modp6144),
            exponent_bits: DEFAULT_EXPONENT_BITS,
        }
    }
}

impl KeyAgreementConfig {
    /// Config for `group` with the default exponent size.
    pub fn with_group(group: Arc<ModpGroup>) -> Self {
        KeyAgreementConfig {
            group,
            exponent_bits: DEFAULT_EXPONENT_BITS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.exponent_bits < MIN_EXPONENT_BITS {
            return Err(Error::invalid_config(format!(
                "exponent_bits must be at least {}, got {}",
                MIN_EXPONENT_BITS, self.exponent_bits
            )));
        }
        if self.exponent_bits > self.group.bits() {
            return Err(Error::invalid_config(format!(
                "exponent_bits {} exceeds the {}-bit modulus",
                self.exponent_bits,
                self.group.bits()
            )));
        }
        Ok(())
    }
}

/// Progress of a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Keys generated, no peer value accepted yet.
    Constructed,
    /// A session key has been derived.
    KeyEstablished,
}

struct Established {
    peer_public_value: BigUint,
    shared_secret: SharedSecret,
    session_key: SessionKey,
}

/// One party's state for a single Diffie-Hellman exchange.
///
/// A fresh instance must be used for every exchange; the private exponent
/// is never reused against a second peer.
pub struct KeyAgreement {
    group: Arc<ModpGroup>,
    private_exponent: Zeroizing<BigUint>,
    public_value: BigUint,
    established: Option<Established>,
}

impl KeyAgreement {
    /// Generates a key pair using the operating system's entropy source.
    ///
    /// # Errors
    /// * `Error::InvalidConfig` if `config` fails validation
    /// * `Error::NoSecureRandomSource` if the OS generator is unavailable
    pub fn new(config: &KeyAgreementConfig) -> Result<Self> {
        Self::with_rng(config, &mut system_entropy())
    }

    /// Generates a key pair drawing the private exponent from `rng`.
    pub fn with_rng<R: EntropySource + ?Sized>(
        config: &KeyAgreementConfig,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        let group = Arc::clone(&config.group);

        let private_exponent = Zeroizing::new(random_exponent(rng, config.exponent_bits)?);
        let public_value = group.g().modpow(&private_exponent, group.p());

        debug!(
            "generated {}-bit private exponent over {}",
            config.exponent_bits,
            group.id()
        );

        Ok(KeyAgreement {
            group,
            private_exponent,
            public_value,
            established: None,
        })
    }

    pub fn group(&self) -> &Arc<ModpGroup> {
        &self.group
    }

    /// The value to send to the peer.
    pub fn public_value(&self) -> &BigUint {
        &self.public_value
    }

    /// The public value in canonical fixed-width big-endian form.
    pub fn public_value_bytes(&self) -> Vec<u8> {
        super::modp_group::to_fixed_width(&self.public_value, self.group.byte_len())
    }

    pub fn public_value_hex(&self) -> String {
        hex::encode(self.public_value_bytes())
    }

    pub fn state(&self) -> ExchangeState {
        match self.established {
            Some(_) => ExchangeState::KeyEstablished,
            None => ExchangeState::Constructed,
        }
    }

    /// Range and subgroup check on a peer's public value.
    pub fn validate_peer_public_value(&self, candidate: &BigUint) -> bool {
        self.group.validate_public_value(candidate)
    }

    /// Computes `candidate^x mod p` after validating `candidate`.
    ///
    /// Does not modify the instance.
    ///
    /// # Errors
    /// * `Error::KeyAlreadyEstablished` if a key was already derived for a
    ///   different peer value
    /// * `Error::InvalidPeerKey` if `candidate` fails validation
    pub fn derive_shared_secret(&self, candidate: &BigUint) -> Result<SharedSecret> {
        if let Some(est) = &self.established {
            if est.peer_public_value != *candidate {
                return Err(Error::KeyAlreadyEstablished);
            }
        }
        if !self.validate_peer_public_value(candidate) {
            warn!("rejected peer public value for {}", self.group.id());
            return Err(Error::InvalidPeerKey);
        }
        let value = candidate.modpow(&self.private_exponent, self.group.p());
        Ok(SharedSecret::new(value, self.group.byte_len()))
    }

    /// Derives and stores the session key for `candidate`.
    ///
    /// Repeating the call with the same peer value returns the stored key.
    ///
    /// # Errors
    /// * `Error::InvalidPeerKey` if `candidate` fails validation; the
    ///   instance is left unchanged
    /// * `Error::KeyAlreadyEstablished` if a key was already derived for a
    ///   different peer value
    pub fn derive_session_key(&mut self, candidate: &BigUint) -> Result<&SessionKey> {
        let cached = match &self.established {
            Some(est) if est.peer_public_value == *candidate => true,
            Some(_) => return Err(Error::KeyAlreadyEstablished),
            None => false,
        };

        if !cached {
            let shared_secret = self.derive_shared_secret(candidate)?;
            let session_key = shared_secret.derive_key();
            debug!("session key established over {}", self.group.id());
            self.established = Some(Established {
                peer_public_value: candidate.clone(),
                shared_secret,
                session_key,
            });
        }
        self.session_key()
    }

    /// Decodes a fixed-width peer value and derives the session key from it.
    pub fn derive_session_key_from_bytes(&mut self, peer: &[u8]) -> Result<&SessionKey> {
        let candidate = self.group.decode(peer)?;
        self.derive_session_key(&candidate)
    }

    /// The derived session key.
    ///
    /// # Errors
    /// * `Error::UninitializedKeyAccess` before a successful
    ///   [`KeyAgreement::derive_session_key`]
    pub fn session_key(&self) -> Result<&SessionKey> {
        self.established
            .as_ref()
            .map(|est| &est.session_key)
            .ok_or(Error::UninitializedKeyAccess)
    }

    /// The stored shared secret, available once a session key exists.
    pub fn shared_secret(&self) -> Result<&SharedSecret> {
        self.established
            .as_ref()
            .map(|est| &est.shared_secret)
            .ok_or(Error::UninitializedKeyAccess)
    }
}

impl fmt::Debug for KeyAgreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyAgreement")
            .field("group", &self.group.id())
            .field("public_value_bits", &self.public_value.bits())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::entropy::tests::BrokenRng;
    use num_traits::One;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn config(group: Rfc3526Group) -> KeyAgreementConfig {
        KeyAgreementConfig::with_group(ModpGroup::rfc3526(group))
    }

    fn party(config: &KeyAgreementConfig, seed: u64) -> KeyAgreement {
        KeyAgreement::with_rng(config, &mut ChaCha20Rng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_public_value_matches_exponent() {
        let config = config(Rfc3526Group::Modp1536);
        let alice = party(&config, 1);
        assert!(alice.private_exponent.bits() <= config.exponent_bits);
        assert_eq!(
            alice.public_value(),
            &config.group.g().modpow(&alice.private_exponent, config.group.p())
        );
        assert_eq!(alice.state(), ExchangeState::Constructed);
    }

    #[test]
    fn test_shared_secret_symmetry() {
        let config = KeyAgreementConfig::default();
        let alice = party(&config, 100);
        let bob = party(&config, 200);

        let alice_secret = alice.derive_shared_secret(bob.public_value()).unwrap();
        let bob_secret = bob.derive_shared_secret(alice.public_value()).unwrap();
        assert_eq!(alice_secret, bob_secret, "Diffie-Hellman secrets must match");
        assert_eq!(alice_secret.value(), bob_secret.value());
    }

    #[test]
    fn test_session_keys_match() {
        let config = config(Rfc3526Group::Modp2048);
        let mut alice = party(&config, 3);
        let mut bob = party(&config, 4);
        let alice_pub = alice.public_value().clone();
        let bob_pub = bob.public_value().clone();

        let alice_key = alice.derive_session_key(&bob_pub).unwrap().clone();
        let bob_key = bob.derive_session_key(&alice_pub).unwrap().clone();
        assert_eq!(alice_key, bob_key);
        assert_eq!(alice.state(), ExchangeState::KeyEstablished);
        assert_eq!(
            alice.shared_secret().unwrap(),
            bob.shared_secret().unwrap()
        );
    }

    #[test]
    fn test_own_public_value_is_valid() {
        let config = KeyAgreementConfig::default();
        let alice = party(&config, 5);
        assert!(alice.validate_peer_public_value(alice.public_value()));
    }

    #[test]
    fn test_trivial_peer_values_rejected() {
        let config = KeyAgreementConfig::default();
        let mut alice = party(&config, 6);
        let p_minus_one = config.group.p() - BigUint::one();

        for bad in [BigUint::from(0u32), BigUint::from(1u32), p_minus_one] {
            assert!(!alice.validate_peer_public_value(&bad));
            assert_eq!(alice.derive_shared_secret(&bad), Err(Error::InvalidPeerKey));
            assert_eq!(
                alice.derive_session_key(&bad).map(|k| k.clone()),
                Err(Error::InvalidPeerKey)
            );
            assert_eq!(alice.state(), ExchangeState::Constructed);
            assert_eq!(alice.session_key().unwrap_err(), Error::UninitializedKeyAccess);
        }
    }

    #[test]
    fn test_failed_validation_leaves_instance_usable() {
        let config = config(Rfc3526Group::Modp1536);
        let mut alice = party(&config, 7);
        let bob = party(&config, 8);
        let before = alice.public_value().clone();

        assert!(alice.derive_session_key(&BigUint::from(1u32)).is_err());
        assert_eq!(alice.public_value(), &before);
        assert!(alice.derive_session_key(bob.public_value()).is_ok());
    }

    #[test]
    fn test_session_key_before_exchange() {
        let alice = party(&config(Rfc3526Group::Modp1536), 9);
        assert_eq!(alice.session_key().unwrap_err(), Error::UninitializedKeyAccess);
        assert_eq!(alice.shared_secret().unwrap_err(), Error::UninitializedKeyAccess);
    }

    #[test]
    fn test_derive_session_key_is_idempotent() {
        let config = config(Rfc3526Group::Modp1536);
        let mut alice = party(&config, 10);
        let bob_pub = party(&config, 11).public_value().clone();

        let first = alice.derive_session_key(&bob_pub).unwrap().clone();
        let second = alice.derive_session_key(&bob_pub).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(alice.session_key().unwrap(), &first);
    }

    #[test]
    fn test_second_peer_rejected() {
        let config = config(Rfc3526Group::Modp1536);
        let mut alice = party(&config, 12);
        let bob_pub = party(&config, 13).public_value().clone();
        let carol_pub = party(&config, 14).public_value().clone();

        let key = alice.derive_session_key(&bob_pub).unwrap().clone();
        assert_eq!(
            alice.derive_session_key(&carol_pub).map(|k| k.clone()),
            Err(Error::KeyAlreadyEstablished)
        );
        assert_eq!(alice.session_key().unwrap(), &key);
    }

    #[test]
    fn test_different_peers_give_different_keys() {
        let config = config(Rfc3526Group::Modp1536);
        // Same seed, same exponent: only the peer differs.
        let mut alice = party(&config, 15);
        let mut alice_again = party(&config, 15);
        let bob_pub = party(&config, 16).public_value().clone();
        let carol_pub = party(&config, 17).public_value().clone();

        let with_bob = alice.derive_session_key(&bob_pub).unwrap().clone();
        let with_carol = alice_again.derive_session_key(&carol_pub).unwrap().clone();
        assert_ne!(with_bob, with_carol);
    }

    #[test]
    fn test_shared_secret_with_second_peer_rejected() {
        let config = config(Rfc3526Group::Modp1536);
        let mut alice = party(&config, 21);
        let bob_pub = party(&config, 22).public_value().clone();
        let carol_pub = party(&config, 23).public_value().clone();

        let key = alice.derive_session_key(&bob_pub).unwrap().clone();
        assert_eq!(
            alice.derive_shared_secret(&carol_pub),
            Err(Error::KeyAlreadyEstablished)
        );
        assert_eq!(alice.state(), ExchangeState::KeyEstablished);

        // The established peer still yields the stored secret.
        let again = alice.derive_shared_secret(&bob_pub).unwrap();
        assert_eq!(&again, alice.shared_secret().unwrap());
        assert_eq!(again.derive_key(), key);
    }

    #[test]
    fn test_public_value_bytes_round_trip() {
        let config = config(Rfc3526Group::Modp2048);
        let mut alice = party(&config, 18);
        let bob = party(&config, 19);

        let wire = bob.public_value_bytes();
        assert_eq!(wire.len(), 256);
        assert_eq!(bob.public_value_hex().len(), 512);

        let expected = alice.derive_shared_secret(bob.public_value()).unwrap().derive_key();
        let key = alice.derive_session_key_from_bytes(&wire).unwrap();
        assert_eq!(key, &expected);
    }

    #[test]
    fn test_config_validation() {
        let mut config = config(Rfc3526Group::Modp1536);
        config.exponent_bits = 128;
        assert!(matches!(
            KeyAgreement::with_rng(&config, &mut ChaCha20Rng::seed_from_u64(0)),
            Err(Error::InvalidConfig(_))
        ));
        config.exponent_bits = 2048;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        config.exponent_bits = MIN_EXPONENT_BITS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = KeyAgreementConfig::default();
        assert_eq!(config.exponent_bits, DEFAULT_EXPONENT_BITS);
        assert_eq!(config.group.bits(), 6144);
    }

    #[test]
    fn test_missing_entropy_is_fatal() {
        let config = config(Rfc3526Group::Modp1536);
        assert!(matches!(
            KeyAgreement::with_rng(&config, &mut BrokenRng),
            Err(Error::NoSecureRandomSource(_))
        ));
    }

    #[test]
    fn test_debug_hides_private_exponent() {
        let alice = party(&config(Rfc3526Group::Modp1536), 20);
        let rendered = format!("{:?}", alice);
        assert!(rendered.contains("KeyAgreement"));
        assert!(!rendered.contains(&alice.private_exponent.to_string()));
    }
}
