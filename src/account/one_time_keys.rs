use crate::{Curve25519PublicKey, Curve25519SecretKey, Error, KeyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Number of random bytes consumed per generated one-time key.
pub(crate) const ONE_TIME_KEY_RANDOM_LENGTH: usize = 32;

/// The unpublished one-time keys of an account, ready for upload.
///
/// Serializes to the protocol-fixed form
/// `{"curve25519": {"<key id>": "<base64>"}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeKeys {
    /// Public one-time keys by ID.
    pub curve25519: BTreeMap<KeyId, Curve25519PublicKey>,
}

impl OneTimeKeys {
    /// Number of keys in the bundle.
    pub fn len(&self) -> usize {
        self.curve25519.len()
    }

    /// Whether the bundle holds no keys.
    pub fn is_empty(&self) -> bool {
        self.curve25519.is_empty()
    }

    /// Serializes the bundle as JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a bundle previously produced by [`OneTimeKeys::to_json`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outcome of a one-time key generation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OneTimeKeyGenerationResult {
    /// Public halves of the newly created keys, oldest first.
    pub created: Vec<Curve25519PublicKey>,
    /// Public halves of the keys evicted to stay within the cap, oldest first.
    pub removed: Vec<Curve25519PublicKey>,
}

/// An ephemeral Curve25519 key pair handed out for session establishment.
pub(crate) struct OneTimeKey {
    secret: Curve25519SecretKey,
    public: Curve25519PublicKey,
    published: bool,
}

impl OneTimeKey {
    fn new(secret: Curve25519SecretKey, published: bool) -> Self {
        let public = secret.public_key();

        Self {
            secret,
            public,
            published,
        }
    }

    pub(crate) fn secret(&self) -> &Curve25519SecretKey {
        &self.secret
    }

    pub(crate) fn public_key(&self) -> Curve25519PublicKey {
        self.public
    }

    pub(crate) fn is_published(&self) -> bool {
        self.published
    }
}

/// Storage for one-time keys with monotonic ID allocation and FIFO eviction.
///
/// IDs start at 1, as in libolm, and grow strictly, so iteration order of
/// the map is also age order.
pub(crate) struct OneTimeKeyStore {
    keys: BTreeMap<KeyId, OneTimeKey>,
    next_id: u32,
    max_keys: usize,
}

impl OneTimeKeyStore {
    pub(crate) fn new(max_keys: usize) -> Self {
        Self {
            keys: BTreeMap::new(),
            next_id: 1,
            max_keys,
        }
    }

    /// Rebuilds a store from pickled parts, rejecting inconsistent state.
    pub(crate) fn restore(
        keys: impl IntoIterator<Item = (u32, Zeroizing<[u8; 32]>, bool)>,
        next_id: u32,
        max_keys: usize,
    ) -> Result<Self, Error> {
        let mut store = Self {
            keys: BTreeMap::new(),
            next_id,
            max_keys,
        };

        for (id, secret, published) in keys {
            if id >= next_id {
                return Err(Error::Pickle(format!(
                    "One-time key ID {id} was never allocated"
                )));
            }

            let key = OneTimeKey::new(Curve25519SecretKey::from_bytes(&secret), published);
            if store.keys.insert(KeyId(id), key).is_some() {
                return Err(Error::Pickle(format!("Duplicate one-time key ID {id}")));
            }
        }

        if store.keys.len() > max_keys {
            return Err(Error::Pickle(format!(
                "Pickle holds {} one-time keys, more than the limit of {max_keys}",
                store.keys.len()
            )));
        }

        Ok(store)
    }

    /// Returns the ID following a batch of `count` keys, or
    /// [`Error::PreKey`] if the ID space cannot cover the batch.
    fn end_of_batch(&self, count: usize) -> Result<u32, Error> {
        u32::try_from(count)
            .ok()
            .and_then(|count| self.next_id.checked_add(count))
            .ok_or_else(|| {
                Error::PreKey(format!("Not enough one-time key IDs left for {count} keys"))
            })
    }

    /// Number of keys of a `count`-sized batch that are materialized.
    ///
    /// A batch larger than the cap would evict its own oldest keys right
    /// away, so only the newest `max_keys` of them are ever created. Fails
    /// before anything is allocated if the batch cannot be given IDs.
    pub(crate) fn keys_to_create(&self, count: usize) -> Result<usize, Error> {
        self.end_of_batch(count)?;

        Ok(count.min(self.max_keys))
    }

    /// Creates a batch of `count` keys from `random`, which must hold one
    /// [`ONE_TIME_KEY_RANDOM_LENGTH`] chunk per key reported by
    /// [`Self::keys_to_create`]. Then evicts the oldest keys until the store
    /// is back within its cap.
    ///
    /// IDs of keys skipped for exceeding the cap are consumed all the same.
    /// Fails without touching the store if the request is inconsistent.
    pub(crate) fn generate(
        &mut self,
        count: usize,
        random: &[u8],
    ) -> Result<OneTimeKeyGenerationResult, Error> {
        let end_id = self.end_of_batch(count)?;
        let to_create = self.keys_to_create(count)?;
        if random.len() != to_create * ONE_TIME_KEY_RANDOM_LENGTH {
            return Err(Error::PreKey(format!(
                "Expected randomness for {to_create} one-time keys, got {} bytes",
                random.len()
            )));
        }

        let skipped = u32::try_from(count - to_create)
            .map_err(|_| Error::PreKey("One-time key IDs exhausted".to_string()))?;
        self.next_id += skipped;

        let mut result = OneTimeKeyGenerationResult {
            created: Vec::with_capacity(to_create),
            removed: Vec::new(),
        };

        let mut secret_bytes = Zeroizing::new([0u8; 32]);
        for chunk in random.chunks_exact(ONE_TIME_KEY_RANDOM_LENGTH) {
            secret_bytes.copy_from_slice(chunk);
            let key = OneTimeKey::new(Curve25519SecretKey::from_bytes(&secret_bytes), false);

            result.created.push(key.public_key());
            self.keys.insert(KeyId(self.next_id), key);
            self.next_id += 1;
        }
        debug_assert_eq!(self.next_id, end_id);

        while self.keys.len() > self.max_keys {
            match self.keys.pop_first() {
                Some((_, evicted)) => result.removed.push(evicted.public_key()),
                None => break,
            }
        }

        Ok(result)
    }

    /// Returns the public halves of all keys not yet marked as published.
    pub(crate) fn unpublished(&self) -> OneTimeKeys {
        OneTimeKeys {
            curve25519: self
                .keys
                .iter()
                .filter(|(_, key)| !key.is_published())
                .map(|(id, key)| (*id, key.public_key()))
                .collect(),
        }
    }

    /// Marks every held key as published and returns how many changed.
    pub(crate) fn mark_as_published(&mut self) -> usize {
        let mut marked = 0;
        for key in self.keys.values_mut().filter(|key| !key.published) {
            key.published = true;
            marked += 1;
        }

        marked
    }

    /// Looks up the secret half of a held key, published or not.
    pub(crate) fn get_secret_key(
        &self,
        public_key: &Curve25519PublicKey,
    ) -> Option<&Curve25519SecretKey> {
        self.keys
            .values()
            .find(|key| key.public_key() == *public_key)
            .map(OneTimeKey::secret)
    }

    /// Removes the key with the given public half and returns its ID.
    pub(crate) fn remove(&mut self, public_key: &Curve25519PublicKey) -> Option<KeyId> {
        let id = self
            .keys
            .iter()
            .find(|(_, key)| key.public_key() == *public_key)
            .map(|(id, _)| *id)?;

        self.keys.remove(&id).map(|_| id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&KeyId, &OneTimeKey)> {
        self.keys.iter()
    }

    pub(crate) fn count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn unpublished_count(&self) -> usize {
        self.keys.values().filter(|key| !key.is_published()).count()
    }

    pub(crate) fn next_id(&self) -> u32 {
        self.next_id
    }

    pub(crate) fn max_keys(&self) -> usize {
        self.max_keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_for(count: usize, fill: u8) -> Vec<u8> {
        (0..count * ONE_TIME_KEY_RANDOM_LENGTH)
            .map(|i| fill.wrapping_add((i / ONE_TIME_KEY_RANDOM_LENGTH) as u8))
            .collect()
    }

    #[test]
    fn test_generation_allocates_sequential_ids() {
        let mut store = OneTimeKeyStore::new(10);

        let result = store.generate(3, &random_for(3, 1)).unwrap();
        assert_eq!(result.created.len(), 3);
        assert!(result.removed.is_empty());

        let ids: Vec<u32> = store.iter().map(|(id, _)| id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.next_id(), 4);
    }

    #[test]
    fn test_eviction_drops_oldest_first() {
        let mut store = OneTimeKeyStore::new(4);

        let first = store.generate(3, &random_for(3, 10)).unwrap();
        let second = store.generate(3, &random_for(3, 50)).unwrap();

        assert_eq!(store.count(), 4);
        assert_eq!(second.removed, first.created[..2].to_vec());

        let ids: Vec<u32> = store.iter().map(|(id, _)| id.value()).collect();
        assert_eq!(ids, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut store = OneTimeKeyStore::new(10);
        let result = store.generate(2, &random_for(2, 1)).unwrap();

        assert_eq!(store.remove(&result.created[1]), Some(KeyId(2)));
        assert_eq!(store.remove(&result.created[1]), None);

        store.generate(1, &random_for(1, 100)).unwrap();
        let ids: Vec<u32> = store.iter().map(|(id, _)| id.value()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_publication_excludes_from_bundle() {
        let mut store = OneTimeKeyStore::new(10);
        store.generate(2, &random_for(2, 1)).unwrap();

        assert_eq!(store.mark_as_published(), 2);
        assert_eq!(store.mark_as_published(), 0);
        assert!(store.unpublished().is_empty());
        assert_eq!(store.count(), 2);

        store.generate(1, &random_for(1, 7)).unwrap();
        let bundle = store.unpublished();
        assert_eq!(bundle.curve25519.keys().copied().collect::<Vec<_>>(), vec![KeyId(3)]);
        assert_eq!(store.unpublished_count(), 1);
    }

    #[test]
    fn test_id_exhaustion_leaves_store_untouched() {
        let mut store = OneTimeKeyStore::new(10);
        store.next_id = u32::MAX - 1;

        assert!(matches!(
            store.generate(2, &random_for(2, 1)),
            Err(Error::PreKey(_))
        ));
        assert!(matches!(store.keys_to_create(2), Err(Error::PreKey(_))));
        assert_eq!(store.count(), 0);
        assert_eq!(store.next_id(), u32::MAX - 1);
    }

    #[test]
    fn test_batch_larger_than_cap_only_creates_survivors() {
        let mut store = OneTimeKeyStore::new(3);
        store.generate(2, &random_for(2, 1)).unwrap();

        assert_eq!(store.keys_to_create(10).unwrap(), 3);
        let result = store.generate(10, &random_for(3, 20)).unwrap();

        assert_eq!(result.created.len(), 3);
        assert_eq!(result.removed.len(), 2);
        let ids: Vec<u32> = store.iter().map(|(id, _)| id.value()).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(store.next_id(), 13);
    }

    #[test]
    fn test_mismatched_randomness_is_rejected() {
        let mut store = OneTimeKeyStore::new(10);

        assert!(matches!(
            store.generate(3, &random_for(2, 1)),
            Err(Error::PreKey(_))
        ));
        assert_eq!(store.count(), 0);
        assert_eq!(store.next_id(), 1);
    }

    #[test]
    fn test_restore_rejects_inconsistent_state() {
        let secret = || Zeroizing::new([4u8; 32]);

        assert!(matches!(
            OneTimeKeyStore::restore(vec![(5, secret(), false)], 5, 10),
            Err(Error::Pickle(_))
        ));
        assert!(matches!(
            OneTimeKeyStore::restore(vec![(1, secret(), false), (1, secret(), true)], 5, 10),
            Err(Error::Pickle(_))
        ));
        assert!(matches!(
            OneTimeKeyStore::restore(vec![(1, secret(), false), (2, secret(), true)], 5, 1),
            Err(Error::Pickle(_))
        ));

        let store = OneTimeKeyStore::restore(vec![(3, secret(), true)], 5, 10).unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(store.unpublished_count(), 0);
    }
}
