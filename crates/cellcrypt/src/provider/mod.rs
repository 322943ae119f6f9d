//! The key-store provider seam: where key-encryption keys actually live.
//!
//! A [`KeyStoreProvider`] wraps and unwraps data keys under a key it holds, and
//! signs the key metadata (path plus enclave flag) so a KEK reference read from
//! untrusted storage can be checked before use. Concrete back-ends (cloud key
//! vaults, HSMs) implement the trait outside this crate; this module ships a
//! caching decorator and an in-memory back-end for tests and local work.
//!
//! Provider calls return [`anyhow::Result`]; the key hierarchy wraps failures
//! into [`Error::KeyStoreProvider`] without retrying.

pub mod caching;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use common::Error;
use zeroize::Zeroizing;

pub use caching::CachingKeyStoreProvider;
pub use memory::InMemoryKeyStoreProvider;

/// Algorithm a provider uses to wrap a data key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEncryptionKeyAlgorithm {
    RsaOaep,
}

impl KeyEncryptionKeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyEncryptionKeyAlgorithm::RsaOaep => "RSA_OAEP",
        }
    }
}

impl fmt::Display for KeyEncryptionKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyEncryptionKeyAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "RSA_OAEP" => Ok(KeyEncryptionKeyAlgorithm::RsaOaep),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown key encryption algorithm '{other}'"
            ))),
        }
    }
}

/// An external store holding key-encryption keys.
///
/// Implementations must be safe to call from many threads at once.
#[cfg_attr(test, mockall::automock)]
pub trait KeyStoreProvider: Send + Sync {
    /// Name used in error messages and logs.
    fn provider_name(&self) -> String;

    /// Encrypt `key` under the key at `key_path`.
    fn wrap_key(
        &self,
        key_path: &str,
        algorithm: KeyEncryptionKeyAlgorithm,
        key: &[u8],
    ) -> anyhow::Result<Vec<u8>>;

    /// Decrypt bytes previously produced by [`wrap_key`](Self::wrap_key).
    fn unwrap_key(
        &self,
        key_path: &str,
        algorithm: KeyEncryptionKeyAlgorithm,
        wrapped_key: &[u8],
    ) -> anyhow::Result<Zeroizing<Vec<u8>>>;

    /// Sign `(key_path, allow_enclave_computations)`.
    fn sign(&self, key_path: &str, allow_enclave_computations: bool) -> anyhow::Result<Vec<u8>>;

    /// Check a signature produced by [`sign`](Self::sign).
    fn verify(
        &self,
        key_path: &str,
        allow_enclave_computations: bool,
        signature: &[u8],
    ) -> anyhow::Result<bool>;
}

/// Wrap a provider failure into the crate error, keeping it as the source.
pub(crate) fn provider_error(
    provider: &dyn KeyStoreProvider,
    operation: &'static str,
    source: anyhow::Error,
) -> Error {
    Error::KeyStoreProvider {
        provider: provider.provider_name(),
        operation,
        source: source.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names() {
        assert_eq!(KeyEncryptionKeyAlgorithm::RsaOaep.to_string(), "RSA_OAEP");
        assert_eq!(
            "rsa-oaep".parse::<KeyEncryptionKeyAlgorithm>().unwrap(),
            KeyEncryptionKeyAlgorithm::RsaOaep
        );
        assert!("AES_KW".parse::<KeyEncryptionKeyAlgorithm>().is_err());
    }

    #[test]
    fn provider_error_keeps_source() {
        let mut mock = MockKeyStoreProvider::new();
        mock.expect_provider_name().return_const("vault".to_string());
        let err = provider_error(&mock, "unwrap_key", anyhow::anyhow!("network down"));
        assert_eq!(err.kind(), "key_store_provider_error");
        assert!(err.to_string().contains("vault"));
        assert!(err.to_string().contains("unwrap_key"));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "network down");
    }
}
