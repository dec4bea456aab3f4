/// Tunables of an [`Account`](crate::Account).
///
/// The configuration is stored inside the account's pickle, so a restored
/// account keeps the limits it was created with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountConfig {
    /// Upper bound on the number of one-time keys held at once. Generating
    /// past it evicts the oldest keys first.
    pub max_one_time_keys: usize,
    /// HKDF info used when deriving a session's root and chain keys. Both
    /// sides of a session must agree on it.
    pub session_info: Vec<u8>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            max_one_time_keys: 100,
            session_info: b"OLM_ROOT".to_vec(),
        }
    }
}
