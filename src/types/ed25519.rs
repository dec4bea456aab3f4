use crate::Error;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An Ed25519 public key, the verifiable half of an account's signing identity.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519PublicKey(VerifyingKey);

impl Ed25519PublicKey {
    /// Length of the public key in bytes.
    pub const LENGTH: usize = 32;

    /// Returns the raw bytes of the key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Parses a key from its 32-byte compressed Edwards form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::Serde(format!(
                "Invalid Ed25519 key length: expected {}, got {}",
                Self::LENGTH,
                bytes.len()
            ))
        })?;

        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|err| Error::Serde(err.to_string()))
    }

    /// Encodes the key as unpadded base64.
    pub fn to_base64(&self) -> String {
        STANDARD_NO_PAD.encode(self.as_bytes())
    }

    /// Decodes a key from unpadded base64.
    pub fn from_base64(input: &str) -> Result<Self, Error> {
        let bytes = STANDARD_NO_PAD
            .decode(input)
            .map_err(|err| Error::Serde(err.to_string()))?;

        Self::from_slice(&bytes)
    }

    /// Strictly verifies `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), Error> {
        self.0
            .verify_strict(message, &signature.0)
            .map_err(|err| Error::Signature(err.to_string()))
    }

    pub(crate) fn as_verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl From<VerifyingKey> for Ed25519PublicKey {
    fn from(value: VerifyingKey) -> Self {
        Self(value)
    }
}

impl fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", self.to_base64())
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// An Ed25519 signature produced by an account.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(Signature);

impl Ed25519Signature {
    /// Length of the signature in bytes.
    pub const LENGTH: usize = 64;

    /// Returns the raw bytes of the signature.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    /// Parses a signature from exactly [`Self::LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Signature::from_slice(bytes)
            .map(Self)
            .map_err(|err| Error::Serde(err.to_string()))
    }

    /// Encodes the signature as unpadded base64.
    pub fn to_base64(&self) -> String {
        STANDARD_NO_PAD.encode(self.to_bytes())
    }

    /// Decodes a signature from unpadded base64.
    pub fn from_base64(input: &str) -> Result<Self, Error> {
        let bytes = STANDARD_NO_PAD
            .decode(input)
            .map_err(|err| Error::Serde(err.to_string()))?;

        Self::from_slice(&bytes)
    }
}

impl From<Signature> for Ed25519Signature {
    fn from(value: Signature) -> Self {
        Self(value)
    }
}

impl fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Signature({})", self.to_base64())
    }
}
