use crate::{Curve25519PublicKey, Curve25519SecretKey, Ed25519PublicKey, Ed25519Signature, Error};
use ed25519_dalek::{SecretKey, Signer, SigningKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Number of random bytes consumed when creating an account: an Ed25519
/// seed followed by a Curve25519 secret.
pub(crate) const CREATE_ACCOUNT_RANDOM_LENGTH: usize = 64;

/// The public identity bundle of an account.
///
/// Serializes to the protocol-fixed form
/// `{"curve25519": "<base64>", "ed25519": "<base64>"}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityKeys {
    /// Long-term key used to establish shared secrets.
    pub curve25519: Curve25519PublicKey,
    /// Long-term key used to sign.
    pub ed25519: Ed25519PublicKey,
}

impl IdentityKeys {
    /// Serializes the bundle as JSON, e.g. for upload to a key server.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a bundle previously produced by [`IdentityKeys::to_json`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The long-term secret keys of an account.
///
/// The Ed25519 key is the canonical identity; the Curve25519 key is paired
/// with it at creation time. Both are wiped when dropped.
pub(crate) struct IdentityKeyPair {
    signing_key: Box<SigningKey>,
    curve25519_key: Curve25519SecretKey,
}

impl IdentityKeyPair {
    /// Builds the key pair from [`CREATE_ACCOUNT_RANDOM_LENGTH`] random bytes.
    pub(crate) fn from_random(random: &[u8; CREATE_ACCOUNT_RANDOM_LENGTH]) -> Self {
        let mut signing_seed = Zeroizing::new([0u8; 32]);
        signing_seed.copy_from_slice(&random[..32]);

        let mut curve25519_secret = Zeroizing::new([0u8; 32]);
        curve25519_secret.copy_from_slice(&random[32..]);

        Self::from_parts(&signing_seed, &curve25519_secret)
    }

    /// Builds the key pair from an Ed25519 seed and a Curve25519 secret.
    pub(crate) fn from_parts(signing_seed: &SecretKey, curve25519_secret: &[u8; 32]) -> Self {
        Self {
            signing_key: Box::new(SigningKey::from_bytes(signing_seed)),
            curve25519_key: Curve25519SecretKey::from_bytes(curve25519_secret),
        }
    }

    /// Signs `message` with the Ed25519 key.
    pub(crate) fn sign(&self, message: &[u8]) -> Result<Ed25519Signature, Error> {
        self.signing_key
            .try_sign(message)
            .map(Ed25519Signature::from)
            .map_err(|err| Error::Crypto(err.to_string()))
    }

    pub(crate) fn public_keys(&self) -> IdentityKeys {
        IdentityKeys {
            curve25519: self.curve25519_key.public_key(),
            ed25519: self.signing_key.verifying_key().into(),
        }
    }

    pub(crate) fn curve25519_key(&self) -> &Curve25519SecretKey {
        &self.curve25519_key
    }

    pub(crate) fn signing_seed(&self) -> &SecretKey {
        self.signing_key.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_input_is_split_between_keys() {
        let mut random = [0u8; CREATE_ACCOUNT_RANDOM_LENGTH];
        random[..32].copy_from_slice(&[1u8; 32]);
        random[32..].copy_from_slice(&[2u8; 32]);

        let key_pair = IdentityKeyPair::from_random(&random);

        assert_eq!(key_pair.signing_seed(), &[1u8; 32]);
        assert_eq!(key_pair.curve25519_key().as_bytes(), &[2u8; 32]);
        assert_eq!(
            key_pair.public_keys().ed25519,
            Ed25519PublicKey::from(SigningKey::from_bytes(&[1u8; 32]).verifying_key())
        );
    }

    #[test]
    fn test_signing_and_verification() {
        let key_pair = IdentityKeyPair::from_random(&[42u8; CREATE_ACCOUNT_RANDOM_LENGTH]);
        let message = b"This is a test message";

        let signature = key_pair.sign(message).unwrap();
        let public = key_pair.public_keys().ed25519;
        assert!(public.verify(message, &signature).is_ok());

        let modified_message = b"This is a modified message";
        assert!(public.verify(modified_message, &signature).is_err());
    }

    #[test]
    fn test_identity_keys_json_field_names() {
        let key_pair = IdentityKeyPair::from_random(&[8u8; CREATE_ACCOUNT_RANDOM_LENGTH]);
        let keys = key_pair.public_keys();

        let json = keys.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["curve25519"], keys.curve25519.to_base64());
        assert_eq!(value["ed25519"], keys.ed25519.to_base64());
        assert_eq!(IdentityKeys::from_json(&json).unwrap(), keys);
    }

    #[test]
    fn test_malformed_identity_json() {
        assert!(matches!(
            IdentityKeys::from_json("{\"curve25519\": \"AAAA\"}"),
            Err(Error::Serde(_))
        ));
        assert!(matches!(
            IdentityKeys::from_json("not json"),
            Err(Error::Serde(_))
        ));
    }
}
