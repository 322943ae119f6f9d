//! [`KeyEncryptionKey`]: a reference to a key held by a [`KeyStoreProvider`].

use std::fmt;
use std::sync::Arc;

use common::{Error, Result};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::provider::{provider_error, KeyEncryptionKeyAlgorithm, KeyStoreProvider};

/// Names an external key by `(name, path)` and carries the provider's
/// signature over `(path, allow_enclave_computations)`.
///
/// Immutable once built. Data keys are wrapped with
/// [`KeyEncryptionKeyAlgorithm::RsaOaep`].
#[derive(Clone)]
pub struct KeyEncryptionKey {
    name: String,
    path: String,
    provider: Arc<dyn KeyStoreProvider>,
    allow_enclave_computations: bool,
    signature: Vec<u8>,
}

impl KeyEncryptionKey {
    /// Build a KEK and have the provider sign its metadata.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`] if `name` or `path` is empty.
    /// - [`Error::KeyStoreProvider`] if signing fails.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        provider: Arc<dyn KeyStoreProvider>,
        allow_enclave_computations: bool,
    ) -> Result<Self> {
        let name = name.into();
        let path = path.into();
        ensure_non_empty("name", &name)?;
        ensure_non_empty("path", &path)?;

        let signature = provider
            .sign(&path, allow_enclave_computations)
            .map_err(|e| provider_error(provider.as_ref(), "sign", e))?;
        debug!(kek = %name, key_path = %path, "signed key encryption key metadata");

        Ok(Self {
            name,
            path,
            provider,
            allow_enclave_computations,
            signature,
        })
    }

    /// Rebuild a KEK from stored metadata, verifying its signature first.
    ///
    /// Use this for KEK references read from untrusted storage: a tampered path
    /// could otherwise point decryption at an attacker-controlled key.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`] if `name` or `path` is empty.
    /// - [`Error::SignatureVerificationFailed`] if the signature does not verify.
    /// - [`Error::KeyStoreProvider`] if the provider fails.
    pub fn from_signed(
        name: impl Into<String>,
        path: impl Into<String>,
        provider: Arc<dyn KeyStoreProvider>,
        allow_enclave_computations: bool,
        signature: Vec<u8>,
    ) -> Result<Self> {
        let name = name.into();
        let path = path.into();
        ensure_non_empty("name", &name)?;
        ensure_non_empty("path", &path)?;

        let kek = Self {
            name,
            path,
            provider,
            allow_enclave_computations,
            signature,
        };
        kek.verify()?;
        Ok(kek)
    }

    /// Ask the provider to check the stored signature.
    ///
    /// # Errors
    ///
    /// [`Error::SignatureVerificationFailed`] on a bad signature, or
    /// [`Error::KeyStoreProvider`] if the provider fails.
    pub fn verify(&self) -> Result<()> {
        let valid = self
            .provider
            .verify(&self.path, self.allow_enclave_computations, &self.signature)
            .map_err(|e| provider_error(self.provider.as_ref(), "verify", e))?;
        if !valid {
            warn!(kek = %self.name, key_path = %self.path, "key encryption key signature rejected");
            return Err(Error::SignatureVerificationFailed {
                key_path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Wrap a plaintext data key through the provider.
    pub fn encrypt_encryption_key(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.provider
            .wrap_key(&self.path, KeyEncryptionKeyAlgorithm::RsaOaep, key)
            .map_err(|e| provider_error(self.provider.as_ref(), "wrap_key", e))
    }

    /// Unwrap a data key through the provider.
    pub fn decrypt_encryption_key(&self, wrapped_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.provider
            .unwrap_key(&self.path, KeyEncryptionKeyAlgorithm::RsaOaep, wrapped_key)
            .map_err(|e| provider_error(self.provider.as_ref(), "unwrap_key", e))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn allow_enclave_computations(&self) -> bool {
        self.allow_enclave_computations
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn provider(&self) -> &Arc<dyn KeyStoreProvider> {
        &self.provider
    }
}

fn ensure_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidConfiguration(format!(
            "key encryption key {field} must not be empty"
        )));
    }
    Ok(())
}

impl PartialEq for KeyEncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.allow_enclave_computations == other.allow_enclave_computations
            && self.provider.provider_name() == other.provider.provider_name()
    }
}

impl Eq for KeyEncryptionKey {}

impl fmt::Debug for KeyEncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEncryptionKey")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("provider", &self.provider.provider_name())
            .field("allow_enclave_computations", &self.allow_enclave_computations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockKeyStoreProvider;
    use mockall::predicate::eq;

    fn signing_mock() -> MockKeyStoreProvider {
        let mut mock = MockKeyStoreProvider::new();
        mock.expect_provider_name().return_const("mock".to_string());
        mock.expect_sign()
            .with(eq("vault/key1"), eq(true))
            .times(1)
            .returning(|_, _| Ok(vec![0xAA, 0xBB]));
        mock
    }

    #[test]
    fn construction_signs_metadata() {
        let kek = KeyEncryptionKey::new("kek", "vault/key1", Arc::new(signing_mock()), true).unwrap();
        assert_eq!(kek.signature(), &[0xAA, 0xBB]);
        assert_eq!(kek.name(), "kek");
        assert_eq!(kek.path(), "vault/key1");
        assert!(kek.allow_enclave_computations());
    }

    #[test]
    fn rejects_empty_name_or_path() {
        let err = KeyEncryptionKey::new("", "p", Arc::new(MockKeyStoreProvider::new()), false)
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_configuration");
        let err = KeyEncryptionKey::new("n", "  ", Arc::new(MockKeyStoreProvider::new()), false)
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_configuration");
    }

    #[test]
    fn sign_failure_is_wrapped() {
        let mut mock = MockKeyStoreProvider::new();
        mock.expect_provider_name().return_const("mock".to_string());
        mock.expect_sign().returning(|_, _| Err(anyhow::anyhow!("denied")));
        let err = KeyEncryptionKey::new("kek", "p", Arc::new(mock), false).unwrap_err();
        assert!(matches!(err, Error::KeyStoreProvider { operation: "sign", .. }));
    }

    #[test]
    fn from_signed_rejects_bad_signature() {
        let mut mock = MockKeyStoreProvider::new();
        mock.expect_provider_name().return_const("mock".to_string());
        mock.expect_verify().returning(|_, _, sig| Ok(sig == [1, 2, 3]));

        let provider: Arc<dyn KeyStoreProvider> = Arc::new(mock);
        let ok = KeyEncryptionKey::from_signed("kek", "p", Arc::clone(&provider), false, vec![1, 2, 3]);
        assert!(ok.is_ok());

        let err = KeyEncryptionKey::from_signed("kek", "p", provider, false, vec![9]).unwrap_err();
        assert!(matches!(err, Error::SignatureVerificationFailed { key_path } if key_path == "p"));
    }

    #[test]
    fn unwrap_delegates_with_rsa_oaep() {
        let mut mock = signing_mock();
        mock.expect_unwrap_key()
            .with(eq("vault/key1"), eq(KeyEncryptionKeyAlgorithm::RsaOaep), eq(&[7u8][..]))
            .times(1)
            .returning(|_, _, _| Ok(Zeroizing::new(vec![0x42; 32])));
        let kek = KeyEncryptionKey::new("kek", "vault/key1", Arc::new(mock), true).unwrap();
        assert_eq!(kek.decrypt_encryption_key(&[7]).unwrap().as_slice(), &[0x42; 32]);
    }

    #[test]
    fn debug_omits_signature() {
        let kek = KeyEncryptionKey::new("kek", "vault/key1", Arc::new(signing_mock()), true).unwrap();
        let dbg = format!("{kek:?}");
        assert!(dbg.contains("vault/key1"));
        assert!(!dbg.contains("signature"));
    }
}
