mod shared_secret;
pub(crate) use shared_secret::Shared3DHSecret;

use crate::Curve25519PublicKey;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_secret::ExpandedSecret;
use std::fmt;

/// Public keys that established a session.
///
/// The responder's `one_time_key` is what ties a session back to the
/// account that handed that key out; see
/// [`Account::remove_one_time_keys`](crate::Account::remove_one_time_keys).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeys {
    /// Long-term Curve25519 key of the initiator.
    pub identity_key: Curve25519PublicKey,
    /// Ephemeral Curve25519 key generated by the initiator for this session.
    pub base_key: Curve25519PublicKey,
    /// One-time key of the responder consumed by this session.
    pub one_time_key: Curve25519PublicKey,
}

impl SessionKeys {
    /// Derives the session ID, identical on both sides of the session.
    pub fn session_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.identity_key.as_bytes());
        hasher.update(self.base_key.as_bytes());
        hasher.update(self.one_time_key.as_bytes());

        STANDARD_NO_PAD.encode(hasher.finalize())
    }
}

/// An established Olm session.
///
/// Only the handshake lives here: the session records the keys it was built
/// from and the root and chain keys the handshake produced. A ratchet layered
/// on top takes it from there.
pub struct Session {
    session_keys: SessionKeys,
    secret: ExpandedSecret,
}

impl Session {
    pub(crate) fn new(session_keys: SessionKeys, secret: ExpandedSecret) -> Self {
        Self {
            session_keys,
            secret,
        }
    }

    /// Unique identifier for this session.
    pub fn session_id(&self) -> String {
        self.session_keys.session_id()
    }

    /// The public keys that established this session.
    pub fn session_keys(&self) -> &SessionKeys {
        &self.session_keys
    }

    /// Root key produced by the handshake.
    pub fn root_key(&self) -> &[u8; 32] {
        &self.secret.root_key
    }

    /// First chain key produced by the handshake.
    pub fn chain_key(&self) -> &[u8; 32] {
        &self.secret.chain_key
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id())
            .field("session_keys", &self.session_keys)
            .finish_non_exhaustive()
    }
}
