//! Per-context cache of algorithm instances keyed by (DEK, encryption type).

use std::sync::Arc;

use common::{EncryptionType, Result};
use tracing::debug;

use super::AeadAes256CbcHmacSha256;
use crate::cache::BoundedCache;
use crate::keys::DataEncryptionKey;

/// `(key name, key fingerprint, mode)`; the fingerprint stands in for the key.
type AlgorithmKey = (String, String, EncryptionType);

/// Shared algorithm instances. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct AlgorithmCache {
    inner: BoundedCache<AlgorithmKey, Arc<AeadAes256CbcHmacSha256>>,
}

impl AlgorithmCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: BoundedCache::new(capacity),
        }
    }

    /// Return the algorithm for `(key, encryption_type)`, building it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`](common::Error::InvalidConfiguration)
    /// for [`EncryptionType::Plaintext`]; nothing is cached in that case.
    pub fn get_or_create(
        &self,
        key: &Arc<DataEncryptionKey>,
        encryption_type: EncryptionType,
    ) -> Result<Arc<AeadAes256CbcHmacSha256>> {
        let cache_key = (
            key.name().to_owned(),
            key.fingerprint().to_owned(),
            encryption_type,
        );
        self.inner.get_or_try_insert_with(cache_key, || {
            debug!(key = %key.name(), %encryption_type, "creating encryption algorithm");
            AeadAes256CbcHmacSha256::new(Arc::clone(key), encryption_type).map(Arc::new)
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}
