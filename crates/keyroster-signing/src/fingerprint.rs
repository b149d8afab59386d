//! OpenPGP v4 key fingerprints

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SigningError};

/// A 160-bit OpenPGP key fingerprint.
///
/// Rosters store it as 40 uppercase hex digits ([`Fingerprint::hex`]); for
/// humans it is shown in groups of four ([`fmt::Display`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 20]);

impl Fingerprint {
    /// Length in bytes
    pub const LEN: usize = 20;

    /// Wrap raw fingerprint bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse 40 hex digits. Whitespace anywhere is ignored and case doesn't
    /// matter, so both `B79F0840...` and `B79F 0840 ...` are accepted.
    pub fn parse(input: &str) -> Result<Self> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.len() != Self::LEN * 2 {
            return Err(SigningError::InvalidFingerprint(input.to_string()));
        }

        let decoded =
            hex::decode(&compact).map_err(|_| SigningError::InvalidFingerprint(input.to_string()))?;

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// 40 uppercase hex digits, no separators
    pub fn hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// `OPENPGP4FPR:` URI form
    pub fn uri(&self) -> String {
        format!("OPENPGP4FPR:{}", self.hex())
    }

    /// The 64-bit key ID (low 8 bytes of the fingerprint)
    pub fn key_id(&self) -> [u8; 8] {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.0[12..]);
        id
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.0.chunks(2).enumerate() {
            match i {
                0 => {}
                5 => f.write_str("  ")?,
                _ => f.write_str(" ")?,
            }
            write!(f, "{:02X}{:02X}", pair[0], pair[1])?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.hex())
    }
}

impl FromStr for Fingerprint {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
