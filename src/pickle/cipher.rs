use crate::Error;
use crate::random::fill_random;
use aes_gcm_siv::aead::{Aead, Payload};
use aes_gcm_siv::{Aes256GcmSiv, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use hkdf::Hkdf;
use rand::TryCryptoRng;
use sha2::Sha256;
use zeroize::Zeroizing;

const PICKLE_FORMAT_VERSION: u8 = 1;
const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const PICKLE_INFO: &[u8] = b"OLM_ACCOUNT_PICKLE";

/// Derives the AEAD cipher and nonce for one pickle from the caller's key and
/// the pickle's salt.
fn derive_cipher(pickle_key: &[u8], salt: &[u8]) -> Result<(Aes256GcmSiv, Nonce), Error> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), pickle_key);

    // 32 bytes of AES key followed by the nonce
    let mut derived_material = Zeroizing::new([0u8; 32 + NONCE_SIZE]);
    hkdf.expand(PICKLE_INFO, derived_material.as_mut_slice())
        .map_err(|err| Error::Crypto(format!("HKDF expansion failed: {err}")))?;

    let key = aes_gcm_siv::Key::<Aes256GcmSiv>::from_slice(&derived_material[..32]);
    let cipher = Aes256GcmSiv::new(key);
    let nonce = Nonce::clone_from_slice(&derived_material[32..]);

    Ok((cipher, nonce))
}

fn check_key(pickle_key: &[u8]) -> Result<(), Error> {
    if pickle_key.is_empty() {
        return Err(Error::Pickle("The pickle key must not be empty".to_string()));
    }

    Ok(())
}

/// Encrypts `plaintext` under `pickle_key` into a text-safe pickle.
///
/// Layout before base64: version (1 byte) || salt (16 bytes) || ciphertext
/// with tag. A fresh salt per pickle gives each pickle its own key and nonce.
pub(crate) fn encrypt<R: TryCryptoRng + ?Sized>(
    rng: &mut R,
    pickle_key: &[u8],
    plaintext: &[u8],
) -> Result<String, Error> {
    check_key(pickle_key)?;

    let mut salt = [0u8; SALT_SIZE];
    fill_random(rng, &mut salt)?;

    let (cipher, nonce) = derive_cipher(pickle_key, &salt)?;
    let ciphertext = cipher.encrypt(
        &nonce,
        Payload {
            msg: plaintext,
            aad: &[PICKLE_FORMAT_VERSION],
        },
    )?;

    let mut output = Vec::with_capacity(1 + SALT_SIZE + ciphertext.len());
    output.push(PICKLE_FORMAT_VERSION);
    output.extend_from_slice(&salt);
    output.extend_from_slice(&ciphertext);

    Ok(STANDARD_NO_PAD.encode(output))
}

/// Decrypts a pickle produced by [`encrypt`].
///
/// Every failure, including a wrong key, is reported as [`Error::Pickle`].
pub(crate) fn decrypt(pickle_key: &[u8], pickle: &str) -> Result<Zeroizing<Vec<u8>>, Error> {
    check_key(pickle_key)?;

    let bytes = STANDARD_NO_PAD
        .decode(pickle.trim())
        .map_err(|err| Error::Pickle(format!("The pickle is not valid base64: {err}")))?;

    let Some((&version, rest)) = bytes.split_first() else {
        return Err(Error::Pickle("The pickle is empty".to_string()));
    };

    if version != PICKLE_FORMAT_VERSION {
        return Err(Error::Pickle(format!(
            "Unsupported pickle format version: {version}"
        )));
    }

    if rest.len() < SALT_SIZE + TAG_SIZE {
        return Err(Error::Pickle("The pickle is truncated".to_string()));
    }

    let (salt, ciphertext) = rest.split_at(SALT_SIZE);
    let (cipher, nonce) = derive_cipher(pickle_key, salt)?;

    cipher
        .decrypt(
            &nonce,
            Payload {
                msg: ciphertext,
                aad: &[PICKLE_FORMAT_VERSION],
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| {
            Error::Pickle(
                "The pickle could not be decrypted: wrong key or corrupted data".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::tests::FailingRng;
    use rand::rngs::OsRng;

    #[test]
    fn test_encrypt_then_decrypt() {
        let pickle = encrypt(&mut OsRng, b"secret", b"account state").unwrap();
        let plaintext = decrypt(b"secret", &pickle).unwrap();

        assert_eq!(plaintext.as_slice(), b"account state");
    }

    #[test]
    fn test_each_pickle_is_salted() {
        let first = encrypt(&mut OsRng, b"secret", b"account state").unwrap();
        let second = encrypt(&mut OsRng, b"secret", b"account state").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_key_fails() {
        let pickle = encrypt(&mut OsRng, b"secret", b"account state").unwrap();

        assert!(matches!(decrypt(b"Secret", &pickle), Err(Error::Pickle(_))));
    }

    #[test]
    fn test_tampering_is_detected() {
        let pickle = encrypt(&mut OsRng, b"secret", b"account state").unwrap();
        let mut bytes = STANDARD_NO_PAD.decode(&pickle).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = STANDARD_NO_PAD.encode(&bytes);

        assert!(matches!(decrypt(b"secret", &tampered), Err(Error::Pickle(_))));
    }

    #[test]
    fn test_malformed_pickles_are_rejected() {
        let pickle = encrypt(&mut OsRng, b"secret", b"account state").unwrap();
        let mut bytes = STANDARD_NO_PAD.decode(&pickle).unwrap();

        assert!(matches!(decrypt(b"secret", ""), Err(Error::Pickle(_))));
        assert!(matches!(decrypt(b"secret", "%%%"), Err(Error::Pickle(_))));
        assert!(matches!(
            decrypt(b"secret", &pickle[..10]),
            Err(Error::Pickle(_))
        ));

        bytes[0] = 2;
        assert!(matches!(
            decrypt(b"secret", &STANDARD_NO_PAD.encode(&bytes)),
            Err(Error::Pickle(_))
        ));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(matches!(
            encrypt(&mut OsRng, b"", b"account state"),
            Err(Error::Pickle(_))
        ));
        assert!(matches!(decrypt(b"", "AQ"), Err(Error::Pickle(_))));
    }

    #[test]
    fn test_encrypt_needs_entropy() {
        assert_eq!(
            encrypt(&mut FailingRng, b"secret", b"account state"),
            Err(Error::Random)
        );
    }
}
