mod config;
pub use config::*;
mod identity_keys;
pub use identity_keys::IdentityKeys;
mod one_time_keys;
pub use one_time_keys::{OneTimeKeyGenerationResult, OneTimeKeys};

pub(crate) use identity_keys::IdentityKeyPair;
pub(crate) use one_time_keys::OneTimeKeyStore;

use crate::random::fill_random;
use crate::session::Shared3DHSecret;
use crate::utils::ed25519_secret_to_curve25519;
use crate::{
    Curve25519PublicKey, Curve25519SecretKey, Ed25519PublicKey, Ed25519Signature, Error, Session,
    SessionKeys,
};
use ed25519_dalek::SigningKey;
use identity_keys::CREATE_ACCOUNT_RANDOM_LENGTH;
use one_time_keys::ONE_TIME_KEY_RANDOM_LENGTH;
use rand::TryCryptoRng;
use rand::rngs::OsRng;
use std::fmt;
use zeroize::{Zeroizing, ZeroizeOnDrop};

/// An Olm account: a long-term identity plus a supply of one-time keys.
///
/// Operations that change key material take `&mut self`, so a single account
/// is never mutated concurrently without the caller adding synchronization
/// (e.g. wrapping it in a `Mutex`). Separate accounts share no state.
///
/// All secret material is wiped when the account is dropped. Nothing is
/// persisted automatically; call [`Account::pickle`] before dropping an
/// account that must survive.
pub struct Account {
    pub(crate) identity_keys: IdentityKeyPair,
    pub(crate) one_time_keys: OneTimeKeyStore,
    pub(crate) config: AccountConfig,
}

impl Account {
    /// Creates a new account with fresh random identity keys.
    ///
    /// If no configuration is provided, default values are used.
    pub fn new(config: Option<AccountConfig>) -> Result<Self, Error> {
        Self::new_with_rng(&mut OsRng, config)
    }

    /// Creates a new account drawing its identity keys from `rng`.
    pub fn new_with_rng<R: TryCryptoRng + ?Sized>(
        rng: &mut R,
        config: Option<AccountConfig>,
    ) -> Result<Self, Error> {
        let mut random = Zeroizing::new([0u8; CREATE_ACCOUNT_RANDOM_LENGTH]);
        fill_random(rng, random.as_mut_slice())?;

        let account = Self::from_identity_keys(IdentityKeyPair::from_random(&random), config);
        tracing::debug!(
            ed25519 = %account.ed25519_key(),
            curve25519 = %account.curve25519_key(),
            "created account"
        );

        Ok(account)
    }

    /// Deterministically creates an account from an externally issued
    /// Ed25519 key.
    ///
    /// The key's seed is doubled to fill the random input of account
    /// creation, the same way libolm-based clients do it. The account's
    /// Ed25519 identity is exactly `signing_key`. Its Curve25519 key is an
    /// independent deterministic derivation (the raw seed used as an X25519
    /// scalar), **not** a verified pairing with the Ed25519 key. Use
    /// [`Account::from_signing_key_converted`] when the Curve25519 key must
    /// be provably tied to the signing key.
    pub fn from_signing_key(signing_key: &SigningKey, config: Option<AccountConfig>) -> Self {
        let seed = signing_key.as_bytes();
        let mut random = Zeroizing::new([0u8; CREATE_ACCOUNT_RANDOM_LENGTH]);
        random[..32].copy_from_slice(seed);
        random[32..].copy_from_slice(seed);

        let account = Self::from_identity_keys(IdentityKeyPair::from_random(&random), config);
        tracing::debug!(ed25519 = %account.ed25519_key(), "created account from signing key");

        account
    }

    /// Deterministically creates an account from an externally issued
    /// Ed25519 key, deriving the Curve25519 key with the standard birational
    /// map.
    ///
    /// The resulting Curve25519 public key equals
    /// [`ed25519_public_to_curve25519`](crate::utils::ed25519_public_to_curve25519)
    /// applied to the Ed25519 public key.
    pub fn from_signing_key_converted(
        signing_key: &SigningKey,
        config: Option<AccountConfig>,
    ) -> Self {
        let curve25519_key = ed25519_secret_to_curve25519(signing_key);
        let identity_keys =
            IdentityKeyPair::from_parts(signing_key.as_bytes(), curve25519_key.as_bytes());

        let account = Self::from_identity_keys(identity_keys, config);
        tracing::debug!(
            ed25519 = %account.ed25519_key(),
            "created account from converted signing key"
        );

        account
    }

    fn from_identity_keys(identity_keys: IdentityKeyPair, config: Option<AccountConfig>) -> Self {
        let config = config.unwrap_or_default();

        Self {
            identity_keys,
            one_time_keys: OneTimeKeyStore::new(config.max_one_time_keys),
            config,
        }
    }

    /// Returns the configuration for this account.
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Returns the public identity bundle of this account.
    pub fn identity_keys(&self) -> IdentityKeys {
        self.identity_keys.public_keys()
    }

    /// Returns the long-term Curve25519 public key.
    #[inline]
    pub fn curve25519_key(&self) -> Curve25519PublicKey {
        self.identity_keys.curve25519_key().public_key()
    }

    /// Returns the long-term Ed25519 public key.
    #[inline]
    pub fn ed25519_key(&self) -> Ed25519PublicKey {
        self.identity_keys.public_keys().ed25519
    }

    /// Signs `message` with the account's Ed25519 key.
    ///
    /// The signature covers exactly the given bytes, with no framing or
    /// pre-hashing. Empty messages are allowed.
    pub fn sign(&self, message: &[u8]) -> Result<Ed25519Signature, Error> {
        self.identity_keys.sign(message)
    }

    /// Maximum number of one-time keys this account holds at once.
    pub fn max_one_time_keys(&self) -> usize {
        self.one_time_keys.max_keys()
    }

    /// Number of one-time keys currently held, published or not.
    pub fn one_time_key_count(&self) -> usize {
        self.one_time_keys.count()
    }

    /// Number of held one-time keys not yet marked as published.
    pub fn unpublished_one_time_key_count(&self) -> usize {
        self.one_time_keys.unpublished_count()
    }

    /// Generates `count` new one-time keys.
    ///
    /// If the account then holds more than [`Account::max_one_time_keys`],
    /// the oldest keys are discarded first.
    pub fn generate_one_time_keys(
        &mut self,
        count: usize,
    ) -> Result<OneTimeKeyGenerationResult, Error> {
        self.generate_one_time_keys_with_rng(&mut OsRng, count)
    }

    /// Generates `count` new one-time keys drawing randomness from `rng`.
    ///
    /// All randomness is drawn before any key is stored, so a failing source
    /// leaves the account unchanged. A batch larger than the cap only creates
    /// its newest [`Account::max_one_time_keys`] keys; the rest would be
    /// evicted right away, but their key IDs are still used up.
    pub fn generate_one_time_keys_with_rng<R: TryCryptoRng + ?Sized>(
        &mut self,
        rng: &mut R,
        count: usize,
    ) -> Result<OneTimeKeyGenerationResult, Error> {
        let to_create = self.one_time_keys.keys_to_create(count)?;
        let length = to_create
            .checked_mul(ONE_TIME_KEY_RANDOM_LENGTH)
            .ok_or_else(|| Error::PreKey(format!("Cannot generate {count} one-time keys")))?;

        let mut random = Zeroizing::new(vec![0u8; length]);
        fill_random(rng, random.as_mut_slice())?;

        let result = self.one_time_keys.generate(count, &random)?;
        tracing::debug!(
            requested = count,
            created = result.created.len(),
            evicted = result.removed.len(),
            held = self.one_time_keys.count(),
            "generated one-time keys"
        );

        Ok(result)
    }

    /// Returns the public halves of all unpublished one-time keys.
    ///
    /// Keys marked with [`Account::mark_keys_as_published`] are left out;
    /// they remain usable for inbound sessions until removed.
    pub fn one_time_keys(&self) -> OneTimeKeys {
        self.one_time_keys.unpublished()
    }

    /// Marks every currently held one-time key as published.
    pub fn mark_keys_as_published(&mut self) {
        let marked = self.one_time_keys.mark_as_published();
        tracing::debug!(marked, "marked one-time keys as published");
    }

    /// Removes the one-time key consumed by `session`.
    ///
    /// Returns [`Error::KeyNotFound`] if the key is no longer held, for
    /// example after a second removal, or because the session consumed a
    /// key of another account. The account is left untouched in that case.
    pub fn remove_one_time_keys(&mut self, session: &Session) -> Result<(), Error> {
        let public_key = session.session_keys().one_time_key;

        match self.one_time_keys.remove(&public_key) {
            Some(id) => {
                tracing::debug!(
                    key_id = %id,
                    session_id = %session.session_id(),
                    "removed one-time key"
                );
                Ok(())
            }
            None => {
                tracing::warn!(one_time_key = %public_key, "no one-time key to remove");
                Err(Error::KeyNotFound(public_key))
            }
        }
    }

    /// Starts a session with the holder of `their_one_time_key`.
    pub fn create_outbound_session(
        &self,
        their_identity_key: Curve25519PublicKey,
        their_one_time_key: Curve25519PublicKey,
    ) -> Result<Session, Error> {
        self.create_outbound_session_with_rng(&mut OsRng, their_identity_key, their_one_time_key)
    }

    /// Starts a session, drawing the ephemeral base key from `rng`.
    pub fn create_outbound_session_with_rng<R: TryCryptoRng + ?Sized>(
        &self,
        rng: &mut R,
        their_identity_key: Curve25519PublicKey,
        their_one_time_key: Curve25519PublicKey,
    ) -> Result<Session, Error> {
        let mut random = Zeroizing::new([0u8; 32]);
        fill_random(rng, random.as_mut_slice())?;
        let base_key = Curve25519SecretKey::from_bytes(&random);

        let shared_secret = Shared3DHSecret::outbound(
            self.identity_keys.curve25519_key(),
            &base_key,
            &their_identity_key,
            &their_one_time_key,
        )?;

        let session_keys = SessionKeys {
            identity_key: self.curve25519_key(),
            base_key: base_key.public_key(),
            one_time_key: their_one_time_key,
        };

        let session = Session::new(
            session_keys,
            shared_secret.expand(&self.config.session_info)?,
        );
        tracing::debug!(session_id = %session.session_id(), "created outbound session");

        Ok(session)
    }

    /// Accepts a session started by the holder of `their_identity_key`
    /// against our `one_time_key`.
    ///
    /// The key may be published or not. It is **not** removed here; call
    /// [`Account::remove_one_time_keys`] once the session is confirmed.
    pub fn create_inbound_session(
        &self,
        their_identity_key: Curve25519PublicKey,
        their_base_key: Curve25519PublicKey,
        one_time_key: Curve25519PublicKey,
    ) -> Result<Session, Error> {
        let one_time_secret = self
            .one_time_keys
            .get_secret_key(&one_time_key)
            .ok_or(Error::KeyNotFound(one_time_key))?;

        let shared_secret = Shared3DHSecret::inbound(
            self.identity_keys.curve25519_key(),
            one_time_secret,
            &their_identity_key,
            &their_base_key,
        )?;

        let session_keys = SessionKeys {
            identity_key: their_identity_key,
            base_key: their_base_key,
            one_time_key,
        };

        let session = Session::new(
            session_keys,
            shared_secret.expand(&self.config.session_info)?,
        );
        tracing::debug!(session_id = %session.session_id(), "created inbound session");

        Ok(session)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("identity_keys", &self.identity_keys())
            .field("one_time_keys", &self.one_time_keys.count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Every secret field wipes itself when dropped.
impl ZeroizeOnDrop for Account {}
