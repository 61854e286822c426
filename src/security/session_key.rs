//! Shared secrets and the symmetric keys derived from them.

use std::fmt;

use num_bigint_dig::BigUint;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::modp_group::to_fixed_width;

/// Size of a derived session key in bytes.
pub const SESSION_KEY_LEN: usize = 32;

/// The raw Diffie-Hellman value `peer^x mod p`.
///
/// Carries the encoding width of its group so that equal values always
/// encode, and therefore hash, identically.
#[derive(Clone)]
pub struct SharedSecret {
    value: Zeroizing<BigUint>,
    width: usize,
}

impl SharedSecret {
    pub(crate) fn new(value: BigUint, width: usize) -> Self {
        SharedSecret {
            value: Zeroizing::new(value),
            width,
        }
    }

    /// The secret as an integer.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Canonical encoding: big-endian, left-padded to the modulus width.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(to_fixed_width(&self.value, self.width))
    }

    /// SHA-256 over the canonical encoding.
    pub fn derive_key(&self) -> SessionKey {
        let digest = Sha256::digest(self.to_bytes().as_slice());
        let mut key = [0u8; SESSION_KEY_LEN];
        key.copy_from_slice(&digest);
        SessionKey(key)
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.to_bytes().ct_eq(&other.to_bytes()).into()
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

/// A 256-bit symmetric key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for SessionKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SessionKey {}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}
