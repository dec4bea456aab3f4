use crate::Curve25519PublicKey;

/// Errors that can occur while creating, using or restoring an account.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// The randomness source could not supply the requested bytes.
    ///
    /// Never retried internally; the operation that needed entropy is aborted
    /// and the account is left untouched.
    #[error("Random number generation failed")]
    Random,

    /// A cryptographic primitive reported a fault.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// A pickle could not be decrypted or decoded.
    ///
    /// Either the pickle key is wrong or the pickle is corrupted. Callers
    /// usually want to ask for the key again rather than treat this as a bug.
    #[error("Pickle error: {0}")]
    Pickle(String),

    /// The account does not hold a one-time key with this public half.
    #[error("No one-time key matches {0}")]
    KeyNotFound(Curve25519PublicKey),

    /// One-time key bookkeeping failed.
    #[error("One-time key error: {0}")]
    PreKey(String),

    /// A signature did not verify.
    #[error("Signature verification failed: {0}")]
    Signature(String),

    /// Serialization or deserialization failed.
    #[error("Serialization/deserialization failed: {0}")]
    Serde(String),
}

impl From<aes_gcm_siv::Error> for Error {
    fn from(value: aes_gcm_siv::Error) -> Self {
        Self::Crypto(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value.to_string())
    }
}
