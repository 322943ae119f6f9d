//! [`CryptoContext`]: the encrypt/decrypt facade.
//!
//! `encrypt` runs codec serialisation then AEAD encryption; `decrypt` runs the
//! reverse. The context owns the algorithm cache and the codec registry, so two
//! contexts never share cached instances. Batches run sequentially and keep
//! their input order.

use std::sync::Arc;

use common::{EncryptionType, Error, Result, TypeSpec, Value};

use crate::aead::{AeadAes256CbcHmacSha256, AlgorithmCache};
use crate::config::{CryptoConfig, DEFAULT_CACHE_CAPACITY};
use crate::keys::DataEncryptionKey;
use crate::registry::CodecRegistry;
use crate::settings::EncryptionSettings;

#[derive(Debug, Clone)]
pub struct CryptoContext {
    algorithms: AlgorithmCache,
    registry: CodecRegistry,
}

impl CryptoContext {
    pub fn new(algorithm_capacity: usize, codec_capacity: usize) -> Self {
        Self {
            algorithms: AlgorithmCache::new(algorithm_capacity),
            registry: CodecRegistry::new(codec_capacity),
        }
    }

    pub fn from_config(config: &CryptoConfig) -> Self {
        Self::new(config.algorithm_cache_capacity, config.codec_cache_capacity)
    }

    /// The registry used for type lookups; register overrides here.
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn algorithms(&self) -> &AlgorithmCache {
        &self.algorithms
    }

    /// Settings for `spec` under `key`, with the codec resolved through this
    /// context's registry.
    pub fn settings(
        &self,
        key: Arc<DataEncryptionKey>,
        encryption_type: EncryptionType,
        spec: &TypeSpec,
    ) -> Result<EncryptionSettings> {
        EncryptionSettings::for_type(key, encryption_type, &self.registry, spec)
    }

    /// Serialise `value` with the settings' codec and encrypt the bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`] for a missing key or plaintext settings.
    /// - Codec errors when the value does not fit the column type.
    pub fn encrypt(&self, value: &Value, settings: &EncryptionSettings) -> Result<Vec<u8>> {
        let algorithm = self.algorithm_for(settings)?;
        let plaintext = settings.codec().serialize(value)?;
        algorithm.encrypt(&plaintext)
    }

    /// Decrypt `ciphertext` and rebuild the value with the settings' codec.
    ///
    /// Nothing is deserialised unless the tag verifies.
    pub fn decrypt(&self, ciphertext: &[u8], settings: &EncryptionSettings) -> Result<Value> {
        let algorithm = self.algorithm_for(settings)?;
        let plaintext = algorithm.decrypt(ciphertext)?;
        settings.codec().deserialize(&plaintext)
    }

    /// Randomized encryption with the value's default codec.
    pub fn encrypt_with_key(
        &self,
        value: &Value,
        key: &Arc<DataEncryptionKey>,
    ) -> Result<Vec<u8>> {
        let codec = self.registry.codec_for_value(value)?;
        let settings =
            EncryptionSettings::new(Some(Arc::clone(key)), EncryptionType::Randomized, codec);
        self.encrypt(value, &settings)
    }

    /// Reverse of [`encrypt_with_key`](Self::encrypt_with_key); the caller names
    /// the type because ciphertext does not record it.
    pub fn decrypt_with_key(
        &self,
        ciphertext: &[u8],
        key: &Arc<DataEncryptionKey>,
        spec: &TypeSpec,
    ) -> Result<Value> {
        let settings = self.settings(Arc::clone(key), EncryptionType::Randomized, spec)?;
        self.decrypt(ciphertext, &settings)
    }

    /// Encrypt each value in order. `None` (SQL NULL) passes through as `None`.
    ///
    /// # Errors
    ///
    /// The first failing element aborts the batch.
    pub fn encrypt_batch(
        &self,
        values: &[Option<Value>],
        settings: &EncryptionSettings,
    ) -> Result<Vec<Option<Vec<u8>>>> {
        let algorithm = self.algorithm_for(settings)?;
        values
            .iter()
            .map(|value| {
                value
                    .as_ref()
                    .map(|v| algorithm.encrypt(&settings.codec().serialize(v)?))
                    .transpose()
            })
            .collect()
    }

    /// Decrypt each ciphertext in order. `None` passes through as `None`.
    pub fn decrypt_batch(
        &self,
        ciphertexts: &[Option<Vec<u8>>],
        settings: &EncryptionSettings,
    ) -> Result<Vec<Option<Value>>> {
        let algorithm = self.algorithm_for(settings)?;
        ciphertexts
            .iter()
            .map(|ciphertext| {
                ciphertext
                    .as_deref()
                    .map(|c| settings.codec().deserialize(&algorithm.decrypt(c)?))
                    .transpose()
            })
            .collect()
    }

    fn algorithm_for(
        &self,
        settings: &EncryptionSettings,
    ) -> Result<Arc<AeadAes256CbcHmacSha256>> {
        let key = settings.key().ok_or_else(|| {
            Error::InvalidConfiguration("encryption settings carry no data encryption key".into())
        })?;
        if settings.encryption_type() == EncryptionType::Plaintext {
            return Err(Error::InvalidConfiguration(
                "cannot encrypt or decrypt under plaintext settings".into(),
            ));
        }
        self.algorithms.get_or_create(key, settings.encryption_type())
    }
}

impl Default for CryptoContext {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_CAPACITY)
    }
}
