use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while setting up or running a key agreement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The configured entropy source could not supply random bytes.
    #[error("no secure random source available: {0}")]
    NoSecureRandomSource(String),

    /// The peer's public value failed the range or subgroup check.
    #[error("invalid peer public key")]
    InvalidPeerKey,

    /// The session key was read before an exchange completed.
    #[error("session key accessed before key agreement completed")]
    UninitializedKeyAccess,

    /// A key has already been established with a different peer value.
    #[error("key already established with a different peer; start a fresh exchange")]
    KeyAlreadyEstablished,

    /// Custom group parameters were rejected.
    #[error("invalid group parameters: {0}")]
    InvalidGroup(String),

    /// Key agreement configuration is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A peer value could not be decoded.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

impl Error {
    /// Builds an `Error::NoSecureRandomSource`.
    pub fn no_secure_random_source<S: Into<String>>(msg: S) -> Self {
        Error::NoSecureRandomSource(msg.into())
    }

    /// Builds an `Error::InvalidGroup`.
    pub fn invalid_group<S: Into<String>>(msg: S) -> Self {
        Error::InvalidGroup(msg.into())
    }

    /// Builds an `Error::InvalidConfig`.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Builds an `Error::InvalidEncoding`.
    pub fn invalid_encoding<S: Into<String>>(msg: S) -> Self {
        Error::InvalidEncoding(msg.into())
    }
}
