use crate::Error;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use x25519_dalek::{PublicKey, SharedSecret, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A Curve25519 public key, used for Diffie-Hellman key agreement.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Curve25519PublicKey(PublicKey);

impl Curve25519PublicKey {
    /// Length of the public key in bytes.
    pub const LENGTH: usize = 32;

    /// Returns the raw bytes of the key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Returns a copy of the raw bytes of the key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Parses a key from a byte slice of exactly [`Self::LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::Serde(format!(
                "Invalid Curve25519 key length: expected {}, got {}",
                Self::LENGTH,
                bytes.len()
            ))
        })?;

        Ok(Self::from(bytes))
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
}

impl From<[u8; 32]> for Curve25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }
}

impl From<PublicKey> for Curve25519PublicKey {
    fn from(value: PublicKey) -> Self {
        Self(value)
    }
}

impl AsRef<PublicKey> for Curve25519PublicKey {
    fn as_ref(&self) -> &PublicKey {
        &self.0
    }
}

impl fmt::Display for Curve25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Curve25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Curve25519PublicKey({})", self.to_base64())
    }
}

impl Serialize for Curve25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Curve25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// A Curve25519 secret key. Wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Curve25519SecretKey(Box<StaticSecret>);

impl Curve25519SecretKey {
    /// Builds a secret key from raw scalar bytes.
    ///
    /// The bytes are copied; the caller stays responsible for wiping its own
    /// buffer.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(Box::new(StaticSecret::from(*bytes)))
    }

    /// Returns the public half of this key.
    pub fn public_key(&self) -> Curve25519PublicKey {
        PublicKey::from(self.0.as_ref()).into()
    }

    /// Performs a Diffie-Hellman key agreement with another party's public key.
    ///
    /// Fails if the result is the all-zero point, which happens when the other
    /// party hands us a low-order public key.
    pub(crate) fn diffie_hellman(
        &self,
        their_public: &Curve25519PublicKey,
    ) -> Result<SharedSecret, Error> {
        let shared = self.0.diffie_hellman(their_public.as_ref());

        if shared.was_contributory() {
            Ok(shared)
        } else {
            Err(Error::Crypto(
                "Non-contributory Diffie-Hellman result".to_string(),
            ))
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_round_trip() {
        let secret = Curve25519SecretKey::from_bytes(&[7u8; 32]);
        let public = secret.public_key();

        let encoded = public.to_base64();
        assert_eq!(encoded.len(), 43, "Unpadded base64 of 32 bytes");
        assert!(!encoded.ends_with('='));
        assert_eq!(Curve25519PublicKey::from_base64(&encoded).unwrap(), public);
    }

    #[test]
    fn test_invalid_encodings_are_rejected() {
        assert!(matches!(
            Curve25519PublicKey::from_base64("not base64!"),
            Err(Error::Serde(_))
        ));
        assert!(matches!(
            Curve25519PublicKey::from_base64("AAAA"),
            Err(Error::Serde(_))
        ));
        assert!(Curve25519PublicKey::from_slice(&[0u8; 31]).is_err());
    }

    #[test]
    fn test_diffie_hellman_agreement() {
        let alice = Curve25519SecretKey::from_bytes(&[1u8; 32]);
        let bob = Curve25519SecretKey::from_bytes(&[2u8; 32]);

        let alice_shared = alice.diffie_hellman(&bob.public_key()).unwrap();
        let bob_shared = bob.diffie_hellman(&alice.public_key()).unwrap();

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_low_order_point_is_rejected() {
        let secret = Curve25519SecretKey::from_bytes(&[3u8; 32]);
        let identity_point = Curve25519PublicKey::from([0u8; 32]);

        assert!(matches!(
            secret.diffie_hellman(&identity_point),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let public = Curve25519SecretKey::from_bytes(&[9u8; 32]).public_key();
        let json = serde_json::to_string(&public).unwrap();

        assert_eq!(json, format!("\"{}\"", public.to_base64()));
        let parsed: Curve25519PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, public);
    }
}
