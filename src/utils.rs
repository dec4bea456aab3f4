//! Conversions between Ed25519 signing keys and Curve25519 key-agreement keys.
//!
//! Both use the birational map between the Edwards and Montgomery forms of
//! Curve25519. A Curve25519 secret derived with
//! [`ed25519_secret_to_curve25519`] always has the public key that
//! [`ed25519_public_to_curve25519`] yields for the matching Ed25519 public key.

use crate::{Curve25519PublicKey, Curve25519SecretKey, Ed25519PublicKey};
use ed25519_dalek::SigningKey;
use zeroize::Zeroizing;

/// Maps an Ed25519 public key to its Montgomery-form Curve25519 public key.
pub fn ed25519_public_to_curve25519(key: &Ed25519PublicKey) -> Curve25519PublicKey {
    Curve25519PublicKey::from(key.as_verifying_key().to_montgomery().to_bytes())
}

/// Derives the Curve25519 secret key paired with an Ed25519 signing key.
///
/// The scalar is the lower half of SHA-512 of the Ed25519 seed, the same
/// scalar Ed25519 itself signs with.
pub fn ed25519_secret_to_curve25519(key: &SigningKey) -> Curve25519SecretKey {
    let scalar = Zeroizing::new(key.to_scalar_bytes());
    Curve25519SecretKey::from_bytes(&scalar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::TryRngCore;
    use rand::rngs::OsRng;

    fn random_signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        OsRng.try_fill_bytes(&mut seed).unwrap();
        SigningKey::from_bytes(&seed)
    }

    #[test]
    fn test_ed25519_public_to_curve25519() {
        let signing_key = random_signing_key();
        let public = Ed25519PublicKey::from(signing_key.verifying_key());

        let converted = ed25519_public_to_curve25519(&public);
        assert!(!converted.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_ed25519_secret_to_curve25519_matches_public_conversion() {
        let signing_key = random_signing_key();
        let public = Ed25519PublicKey::from(signing_key.verifying_key());

        let secret = ed25519_secret_to_curve25519(&signing_key);
        assert_eq!(secret.public_key(), ed25519_public_to_curve25519(&public));
    }
}
