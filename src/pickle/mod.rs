mod cipher;

use crate::account::{IdentityKeyPair, OneTimeKeyStore};
use crate::{Account, AccountConfig, Error};
use prost::Message;
use rand::TryCryptoRng;
use rand::rngs::OsRng;
use zeroize::{Zeroize, Zeroizing};

/// Schema version of [`AccountPickle`].
const ACCOUNT_PICKLE_VERSION: u32 = 1;

/// Plaintext of an account pickle.
#[derive(Clone, PartialEq, Message)]
pub(crate) struct AccountPickle {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub signing_seed: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub curve25519_secret: Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub one_time_keys: Vec<OneTimeKeyPickle>,
    #[prost(uint32, tag = "5")]
    pub next_key_id: u32,
    #[prost(message, optional, tag = "6")]
    pub config: Option<AccountConfigPickle>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct OneTimeKeyPickle {
    #[prost(uint32, tag = "1")]
    pub key_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub secret: Vec<u8>,
    #[prost(bool, tag = "3")]
    pub published: bool,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct AccountConfigPickle {
    #[prost(uint64, tag = "1")]
    pub max_one_time_keys: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub session_info: Vec<u8>,
}

impl Drop for AccountPickle {
    fn drop(&mut self) {
        self.signing_seed.zeroize();
        self.curve25519_secret.zeroize();
    }
}

impl Drop for OneTimeKeyPickle {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

fn secret_from_slice(bytes: &[u8], what: &str) -> Result<Zeroizing<[u8; 32]>, Error> {
    let mut secret = Zeroizing::new([0u8; 32]);
    if bytes.len() != secret.len() {
        return Err(Error::Pickle(format!("Invalid {what} length: {}", bytes.len())));
    }
    secret.copy_from_slice(bytes);

    Ok(secret)
}

impl Account {
    /// Serializes and encrypts the full secret state of the account.
    ///
    /// The result is base64 text, safe to store as a plain string. Restore it
    /// with [`Account::from_pickle`] and the same `pickle_key`.
    pub fn pickle(&self, pickle_key: &[u8]) -> Result<String, Error> {
        self.pickle_with_rng(&mut OsRng, pickle_key)
    }

    /// Like [`Account::pickle`], drawing the pickle's salt from `rng`.
    pub fn pickle_with_rng<R: TryCryptoRng + ?Sized>(
        &self,
        rng: &mut R,
        pickle_key: &[u8],
    ) -> Result<String, Error> {
        let one_time_keys = self
            .one_time_keys
            .iter()
            .map(|(id, key)| OneTimeKeyPickle {
                key_id: id.value(),
                secret: key.secret().as_bytes().to_vec(),
                published: key.is_published(),
            })
            .collect();

        let account_pickle = AccountPickle {
            version: ACCOUNT_PICKLE_VERSION,
            signing_seed: self.identity_keys.signing_seed().to_vec(),
            curve25519_secret: self.identity_keys.curve25519_key().as_bytes().to_vec(),
            one_time_keys,
            next_key_id: self.one_time_keys.next_id(),
            config: Some(AccountConfigPickle {
                max_one_time_keys: self.config.max_one_time_keys as u64,
                session_info: self.config.session_info.clone(),
            }),
        };

        let plaintext = Zeroizing::new(account_pickle.encode_to_vec());
        let pickle = cipher::encrypt(rng, pickle_key, &plaintext)?;
        tracing::debug!(
            one_time_keys = self.one_time_keys.count(),
            "pickled account"
        );

        Ok(pickle)
    }

    /// Restores an account from a pickle produced by [`Account::pickle`].
    ///
    /// Fails with [`Error::Pickle`] if the key is wrong or the pickle is
    /// corrupted or truncated. A pickle never restores partially.
    pub fn from_pickle(pickle: &str, pickle_key: &[u8]) -> Result<Self, Error> {
        Self::unpickle(pickle, pickle_key).inspect_err(|err| {
            tracing::warn!(error = %err, "rejected account pickle");
        })
    }

    fn unpickle(pickle: &str, pickle_key: &[u8]) -> Result<Self, Error> {
        let plaintext = cipher::decrypt(pickle_key, pickle)?;
        let account_pickle = AccountPickle::decode(plaintext.as_slice())
            .map_err(|err| Error::Pickle(format!("Failed to decode account: {err}")))?;

        if account_pickle.version != ACCOUNT_PICKLE_VERSION {
            return Err(Error::Pickle(format!(
                "Unsupported account schema version: {}",
                account_pickle.version
            )));
        }

        let signing_seed = secret_from_slice(&account_pickle.signing_seed, "signing key")?;
        let curve25519_secret =
            secret_from_slice(&account_pickle.curve25519_secret, "identity key")?;
        let identity_keys = IdentityKeyPair::from_parts(&signing_seed, &curve25519_secret);

        let config = match &account_pickle.config {
            Some(config) => AccountConfig {
                max_one_time_keys: usize::try_from(config.max_one_time_keys)
                    .map_err(|err| Error::Pickle(err.to_string()))?,
                session_info: config.session_info.clone(),
            },
            None => return Err(Error::Pickle("Missing account config".to_string())),
        };

        let one_time_keys = account_pickle
            .one_time_keys
            .iter()
            .map(|key| {
                secret_from_slice(&key.secret, "one-time key")
                    .map(|secret| (key.key_id, secret, key.published))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let one_time_keys = OneTimeKeyStore::restore(
            one_time_keys,
            account_pickle.next_key_id,
            config.max_one_time_keys,
        )?;

        let account = Account {
            identity_keys,
            one_time_keys,
            config,
        };
        tracing::debug!(
            ed25519 = %account.ed25519_key(),
            one_time_keys = account.one_time_key_count(),
            "restored account from pickle"
        );

        Ok(account)
    }
}
