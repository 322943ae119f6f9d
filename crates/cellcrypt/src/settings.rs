//! [`EncryptionSettings`]: what to encrypt a column with, and how.

use std::fmt;
use std::sync::Arc;

use common::{EncryptionType, Result, TypeSpec};

use crate::codec::Codec;
use crate::keys::DataEncryptionKey;
use crate::registry::CodecRegistry;

/// Key, mode, and codec for one logical column.
///
/// `key` is optional so settings can be assembled before a key is resolved;
/// encrypting or decrypting without one fails with
/// [`Error::InvalidConfiguration`](common::Error::InvalidConfiguration), as
/// does [`EncryptionType::Plaintext`].
#[derive(Clone)]
pub struct EncryptionSettings {
    key: Option<Arc<DataEncryptionKey>>,
    encryption_type: EncryptionType,
    codec: Arc<Codec>,
}

impl EncryptionSettings {
    pub fn new(
        key: Option<Arc<DataEncryptionKey>>,
        encryption_type: EncryptionType,
        codec: Arc<Codec>,
    ) -> Self {
        Self {
            key,
            encryption_type,
            codec,
        }
    }

    /// Resolve `spec` through `registry` and bind it to `key`.
    ///
    /// # Errors
    ///
    /// Any error from [`CodecRegistry::codec`].
    pub fn for_type(
        key: Arc<DataEncryptionKey>,
        encryption_type: EncryptionType,
        registry: &CodecRegistry,
        spec: &TypeSpec,
    ) -> Result<Self> {
        Ok(Self::new(Some(key), encryption_type, registry.codec(spec)?))
    }

    pub fn key(&self) -> Option<&Arc<DataEncryptionKey>> {
        self.key.as_ref()
    }

    pub fn encryption_type(&self) -> EncryptionType {
        self.encryption_type
    }

    pub fn codec(&self) -> &Arc<Codec> {
        &self.codec
    }

    pub fn with_key(mut self, key: Arc<DataEncryptionKey>) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_encryption_type(mut self, encryption_type: EncryptionType) -> Self {
        self.encryption_type = encryption_type;
        self
    }
}

impl fmt::Debug for EncryptionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionSettings")
            .field("key", &self.key.as_ref().map(|k| k.key_hint()))
            .field("encryption_type", &self.encryption_type)
            .field("codec", &self.codec.type_id())
            .finish()
    }
}
