//! The single source of entropy used for private exponents.
//!
//! Any `RngCore + CryptoRng` qualifies; by default this is the operating
//! system generator. A failing source is a hard error and there is no
//! fallback to a weaker generator.

use num_bigint_dig::BigUint;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// A cryptographically secure random number generator.
pub trait EntropySource: RngCore + CryptoRng {}

impl<R: RngCore + CryptoRng + ?Sized> EntropySource for R {}

/// The default entropy source.
pub fn system_entropy() -> OsRng {
    OsRng
}

/// Draws a uniformly random integer in `[0, 2^bits)`.
///
/// # Errors
/// * `Error::NoSecureRandomSource` if the generator cannot produce bytes.
pub fn random_exponent<R: EntropySource + ?Sized>(rng: &mut R, bits: usize) -> Result<BigUint> {
    let mut buf = Zeroizing::new(vec![0u8; (bits + 7) / 8]);
    rng.try_fill_bytes(&mut buf)
        .map_err(|e| Error::no_secure_random_source(e.to_string()))?;

    let excess = buf.len() * 8 - bits;
    if excess > 0 {
        buf[0] &= 0xff >> excess;
    }
    Ok(BigUint::from_bytes_be(&buf))
}
