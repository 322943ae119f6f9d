//! [`ProtectedDataEncryptionKey`]: a data key together with its wrapped form.

use std::fmt;
use std::sync::Arc;

use common::Result;
use tracing::debug;

use super::dek::generate_root_key;
use super::{DataEncryptionKey, KeyEncryptionKey};

/// A DEK, the KEK that protects it, and the wrapped key bytes to persist.
///
/// Equality is `(KEK, name, root key fingerprint)`.
#[derive(Clone)]
pub struct ProtectedDataEncryptionKey {
    data_key: Arc<DataEncryptionKey>,
    kek: Arc<KeyEncryptionKey>,
    encrypted_value: Vec<u8>,
}

impl ProtectedDataEncryptionKey {
    /// Generate a random root key and wrap it through `kek`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyStoreProvider`](common::Error::KeyStoreProvider) if
    /// wrapping fails.
    pub fn generate(name: impl Into<String>, kek: Arc<KeyEncryptionKey>) -> Result<Self> {
        let root = generate_root_key();
        let encrypted_value = kek.encrypt_encryption_key(root.as_slice())?;
        let data_key = DataEncryptionKey::new(name, root.as_slice())?;
        debug!(dek = %data_key.name(), kek = %kek.name(), "generated protected data encryption key");
        Ok(Self {
            data_key: Arc::new(data_key),
            kek,
            encrypted_value,
        })
    }

    /// Unwrap `encrypted_value` through `kek` and derive the DEK from it.
    ///
    /// # Errors
    ///
    /// Provider failures are returned as
    /// [`Error::KeyStoreProvider`](common::Error::KeyStoreProvider); an
    /// unwrapped key of the wrong length is
    /// [`Error::InvalidKeySize`](common::Error::InvalidKeySize).
    pub fn from_encrypted(
        name: impl Into<String>,
        kek: Arc<KeyEncryptionKey>,
        encrypted_value: Vec<u8>,
    ) -> Result<Self> {
        let root = kek.decrypt_encryption_key(&encrypted_value)?;
        let data_key = DataEncryptionKey::new(name, &root)?;
        Ok(Self {
            data_key: Arc::new(data_key),
            kek,
            encrypted_value,
        })
    }

    /// The usable data key, shared with every algorithm built over it.
    pub fn data_key(&self) -> &Arc<DataEncryptionKey> {
        &self.data_key
    }

    pub fn key_encryption_key(&self) -> &Arc<KeyEncryptionKey> {
        &self.kek
    }

    /// Wrapped key bytes, safe to store next to the data.
    pub fn encrypted_value(&self) -> &[u8] {
        &self.encrypted_value
    }

    pub fn name(&self) -> &str {
        self.data_key.name()
    }
}

impl PartialEq for ProtectedDataEncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.kek == other.kek
            && self.data_key.name() == other.data_key.name()
            && self.data_key.fingerprint() == other.data_key.fingerprint()
    }
}

impl Eq for ProtectedDataEncryptionKey {}

impl fmt::Debug for ProtectedDataEncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectedDataEncryptionKey")
            .field("data_key", &self.data_key)
            .field("kek", &self.kek)
            .field("encrypted_len", &self.encrypted_value.len())
            .finish()
    }
}
