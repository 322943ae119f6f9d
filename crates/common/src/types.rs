//! Encryption modes and codec selector keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How a logical column is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionType {
    /// Stored as-is; the facade refuses to encrypt under this mode.
    Plaintext,
    /// IV derived from the plaintext: equal values give equal ciphertext.
    Deterministic,
    /// IV drawn from the OS CSPRNG on every call.
    Randomized,
}

impl EncryptionType {
    /// Algorithm identifier recorded in column metadata, if any.
    pub fn algorithm_name(&self) -> Option<&'static str> {
        match self {
            EncryptionType::Plaintext => None,
            EncryptionType::Deterministic => Some("AEAD_AES_256_CBC_HMAC_SHA_256_DETERMINISTIC"),
            EncryptionType::Randomized => Some("AEAD_AES_256_CBC_HMAC_SHA_256_RANDOMIZED"),
        }
    }
}

impl fmt::Display for EncryptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EncryptionType::Plaintext => "Plaintext",
            EncryptionType::Deterministic => "Deterministic",
            EncryptionType::Randomized => "Randomized",
        };
        f.write_str(s)
    }
}

impl FromStr for EncryptionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plaintext" => Ok(EncryptionType::Plaintext),
            "deterministic" => Ok(EncryptionType::Deterministic),
            "randomized" => Ok(EncryptionType::Randomized),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown encryption type '{other}'"
            ))),
        }
    }
}

/// Codec selector: identifies a type id together with its size, precision,
/// scale, and code page.
///
/// `None` fields mean "use the type's default"; for `size` on variable-length
/// types that default is `max` (unbounded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSpec {
    /// Lower-case type identifier, e.g. `"decimal"` or `"nvarchar"`.
    #[serde(deserialize_with = "lowercase")]
    type_id: String,
    pub size: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub codepage: Option<u32>,
}

impl TypeSpec {
    /// Selector for `type_id` with every parameter left at its default.
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into().to_ascii_lowercase(),
            size: None,
            precision: None,
            scale: None,
            codepage: None,
        }
    }

    /// The lower-case type identifier.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Fractional-second scale for temporal types.
    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_codepage(mut self, codepage: u32) -> Self {
        self.codepage = Some(codepage);
        self
    }
}

fn lowercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|id| id.to_ascii_lowercase())
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_id)?;
        match (self.precision, self.scale, self.size) {
            (Some(p), Some(s), _) => write!(f, "({p},{s})")?,
            (None, Some(s), _) => write!(f, "({s})")?,
            (_, _, Some(n)) => write!(f, "({n})")?,
            _ => {}
        }
        if let Some(cp) = self.codepage {
            write!(f, " codepage {cp}")?;
        }
        Ok(())
    }
}
