//! Account-level identity and one-time key management for an Olm-style
//! end-to-end encryption protocol.
//!
//! An [`Account`] owns a long-term Ed25519 signing key and Curve25519
//! key-agreement key, hands out one-time keys for session establishment and
//! can be pickled into an encrypted string for storage.

mod types;
pub use types::*;

mod error;
pub use error::Error;

mod account;
pub use account::{Account, AccountConfig, IdentityKeys, OneTimeKeyGenerationResult, OneTimeKeys};

mod pickle;

mod random;

mod session;
pub use session::{Session, SessionKeys};

pub mod utils;

pub use ed25519_dalek::SigningKey;
