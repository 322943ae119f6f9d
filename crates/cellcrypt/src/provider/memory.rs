//! [`InMemoryKeyStoreProvider`]: master keys held in process memory.
//!
//! Meant for tests and local development. Data keys are wrapped with the
//! crate's own randomized AEAD under the master key registered for the path,
//! and key metadata is signed with HMAC-SHA256 under the same master key.

use std::fmt;
use std::sync::Arc;

use common::{EncryptionType, Result};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use super::{KeyEncryptionKeyAlgorithm, KeyStoreProvider};
use crate::aead::AeadAes256CbcHmacSha256;
use crate::keys::DataEncryptionKey;

type HmacSha256 = Hmac<Sha256>;

const PROVIDER_NAME: &str = "in_memory";

#[derive(Debug, Error)]
pub enum InMemoryKeyStoreError {
    #[error("no master key is registered at path '{0}'")]
    UnknownKeyPath(String),
}

/// Master keys by key path.
#[derive(Clone, Default)]
pub struct InMemoryKeyStoreProvider {
    keys: Arc<DashMap<String, Arc<DataEncryptionKey>>>,
}

impl InMemoryKeyStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a 32-byte master key at `path`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeySize`](common::Error::InvalidKeySize) for
    /// any other length.
    pub fn add_key(&self, path: impl Into<String>, master_key: &[u8]) -> Result<()> {
        let path = path.into();
        let key = DataEncryptionKey::new(path.clone(), master_key)?;
        debug!(key_path = %path, "registered in-memory master key");
        self.keys.insert(path, Arc::new(key));
        Ok(())
    }

    /// Register a fresh random master key at `path`.
    pub fn generate_key(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        let key = DataEncryptionKey::generate(path.clone())?;
        self.keys.insert(path, Arc::new(key));
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.keys.contains_key(path)
    }

    fn master_key(&self, path: &str) -> anyhow::Result<Arc<DataEncryptionKey>> {
        self.keys
            .get(path)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| InMemoryKeyStoreError::UnknownKeyPath(path.to_owned()).into())
    }

    fn algorithm(&self, path: &str) -> anyhow::Result<AeadAes256CbcHmacSha256> {
        let master = self.master_key(path)?;
        Ok(AeadAes256CbcHmacSha256::new(master, EncryptionType::Randomized)?)
    }

    /// MAC over `path ‖ flag` keyed by the path's master key.
    fn metadata_mac(
        &self,
        path: &str,
        allow_enclave_computations: bool,
    ) -> anyhow::Result<HmacSha256> {
        let master = self.master_key(path)?;
        let mut mac = <HmacSha256 as Mac>::new_from_slice(master.root_key())
            .map_err(|e| anyhow::anyhow!("cannot key metadata signature: {e}"))?;
        mac.update(path.as_bytes());
        mac.update(&[u8::from(allow_enclave_computations)]);
        Ok(mac)
    }
}

impl KeyStoreProvider for InMemoryKeyStoreProvider {
    fn provider_name(&self) -> String {
        PROVIDER_NAME.to_owned()
    }

    fn wrap_key(
        &self,
        key_path: &str,
        _algorithm: KeyEncryptionKeyAlgorithm,
        key: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        Ok(self.algorithm(key_path)?.encrypt(key)?)
    }

    fn unwrap_key(
        &self,
        key_path: &str,
        _algorithm: KeyEncryptionKeyAlgorithm,
        wrapped_key: &[u8],
    ) -> anyhow::Result<Zeroizing<Vec<u8>>> {
        let key = self.algorithm(key_path)?.decrypt(wrapped_key)?;
        Ok(Zeroizing::new(key))
    }

    fn sign(&self, key_path: &str, allow_enclave_computations: bool) -> anyhow::Result<Vec<u8>> {
        let mac = self.metadata_mac(key_path, allow_enclave_computations)?;
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify(
        &self,
        key_path: &str,
        allow_enclave_computations: bool,
        signature: &[u8],
    ) -> anyhow::Result<bool> {
        let mac = self.metadata_mac(key_path, allow_enclave_computations)?;
        Ok(mac.verify_slice(signature).is_ok())
    }
}

impl fmt::Debug for InMemoryKeyStoreProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<String> = self.keys.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        f.debug_struct("InMemoryKeyStoreProvider")
            .field("paths", &paths)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA: KeyEncryptionKeyAlgorithm = KeyEncryptionKeyAlgorithm::RsaOaep;

    fn provider() -> InMemoryKeyStoreProvider {
        let provider = InMemoryKeyStoreProvider::new();
        provider.add_key("local/master", &[0x11; 32]).unwrap();
        provider
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let provider = provider();
        let wrapped = provider.wrap_key("local/master", RSA, &[0x42; 32]).unwrap();
        assert_ne!(&wrapped[..], &[0x42; 32][..]);
        let unwrapped = provider.unwrap_key("local/master", RSA, &wrapped).unwrap();
        assert_eq!(unwrapped.as_slice(), &[0x42; 32]);
    }

    #[test]
    fn wrapping_is_randomized() {
        let provider = provider();
        let a = provider.wrap_key("local/master", RSA, &[1; 32]).unwrap();
        let b = provider.wrap_key("local/master", RSA, &[1; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_path_fails() {
        let provider = provider();
        let err = provider.wrap_key("nowhere", RSA, &[1; 32]).unwrap_err();
        assert!(err.downcast_ref::<InMemoryKeyStoreError>().is_some());
        assert!(provider.sign("nowhere", false).is_err());
    }

    #[test]
    fn unwrap_under_another_master_key_fails() {
        let provider = provider();
        provider.generate_key("local/other").unwrap();
        let wrapped = provider.wrap_key("local/master", RSA, &[3; 32]).unwrap();
        let err = provider.unwrap_key("local/other", RSA, &wrapped).unwrap_err();
        let err = err.downcast_ref::<common::Error>().unwrap();
        assert_eq!(err.kind(), "authentication_failed");
    }

    #[test]
    fn signatures_bind_path_and_flag() {
        let provider = provider();
        provider.add_key("local/second", &[0x22; 32]).unwrap();
        let sig = provider.sign("local/master", true).unwrap();
        assert_eq!(sig.len(), 32);
        assert!(provider.verify("local/master", true, &sig).unwrap());
        assert!(!provider.verify("local/master", false, &sig).unwrap());
        assert!(!provider.verify("local/second", true, &sig).unwrap());
        assert!(!provider.verify("local/master", true, &sig[..31]).unwrap());
    }

    #[test]
    fn add_key_checks_length() {
        let provider = InMemoryKeyStoreProvider::new();
        assert!(provider.add_key("p", &[0; 16]).is_err());
        assert!(!provider.contains("p"));
        provider.generate_key("p").unwrap();
        assert!(provider.contains("p"));
    }

    #[test]
    fn clones_share_keys() {
        let provider = InMemoryKeyStoreProvider::new();
        let other = provider.clone();
        provider.add_key("p", &[5; 32]).unwrap();
        assert!(other.contains("p"));
        assert!(format!("{other:?}").contains("\"p\""));
    }
}
