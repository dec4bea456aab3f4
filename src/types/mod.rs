mod curve25519;
pub use curve25519::*;

mod ed25519;
pub use ed25519::*;

mod key_id;
pub use key_id::KeyId;
