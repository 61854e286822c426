//! Diffie-Hellman key agreement over the RFC 3526 MODP groups.
//!
//! Two parties each build a [`KeyAgreement`], exchange
//! [`KeyAgreement::public_value`]s over a transport of their choosing and
//! call [`KeyAgreement::derive_session_key`] with the peer's value. Both
//! arrive at the same 256-bit [`SessionKey`]. Peer values are checked for
//! range and subgroup membership before any secret is computed.
//!
//! ```
//! use modp_dh::{KeyAgreement, KeyAgreementConfig, ModpGroup, Rfc3526Group};
//!
//! # fn main() -> modp_dh::Result<()> {
//! let config = KeyAgreementConfig::with_group(ModpGroup::rfc3526(Rfc3526Group::Modp2048));
//! let mut alice = KeyAgreement::new(&config)?;
//! let mut bob = KeyAgreement::new(&config)?;
//!
//! let alice_public = alice.public_value().clone();
//! let bob_public = bob.public_value().clone();
//!
//! let alice_key = alice.derive_session_key(&bob_public)?.clone();
//! let bob_key = bob.derive_session_key(&alice_public)?.clone();
//! assert_eq!(alice_key, bob_key);
//! # Ok(())
//! # }
//! ```
//!
//! This crate provides the key agreement primitive only. It does not
//! authenticate public values and its modular exponentiation is not
//! constant-time.

pub mod error;
pub mod security;

pub use error::{Error, Result};
pub use security::{
    ExchangeState, GroupId, KeyAgreement, KeyAgreementConfig, ModpGroup, Rfc3526Group,
    SessionKey, SharedSecret,
};
