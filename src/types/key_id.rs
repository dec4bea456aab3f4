use crate::Error;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identifier of a one-time key, unique for the lifetime of an account.
///
/// Rendered on the wire as unpadded base64 of the big-endian `u32`, so the
/// key with ID 1 is published as `"AAAAAQ"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId(pub(crate) u32);

impl KeyId {
    /// Returns the numeric value of the ID.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Encodes the ID in its published form.
    pub fn to_base64(&self) -> String {
        STANDARD_NO_PAD.encode(self.0.to_be_bytes())
    }

    /// Decodes an ID from its published form.
    pub fn from_base64(input: &str) -> Result<Self, Error> {
        let bytes = STANDARD_NO_PAD
            .decode(input)
            .map_err(|err| Error::Serde(err.to_string()))?;
        let bytes: [u8; 4] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::Serde(format!("Invalid key ID: {input}")))?;

        Ok(Self(u32::from_be_bytes(bytes)))
    }
}

impl From<u32> for KeyId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl Serialize for KeyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for KeyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}
