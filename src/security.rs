pub mod diffie_hellman;
pub mod entropy;
pub mod modp_group;
pub mod session_key;

// Re-export Diffie-Hellman functionality
pub use diffie_hellman::{
    ExchangeState, KeyAgreement, KeyAgreementConfig, DEFAULT_EXPONENT_BITS, MIN_EXPONENT_BITS,
};

// Re-export group parameters
pub use modp_group::{GroupId, ModpGroup, Rfc3526Group};

// Re-export entropy and key material
pub use entropy::{random_exponent, system_entropy, EntropySource};
pub use session_key::{SessionKey, SharedSecret, SESSION_KEY_LEN};
