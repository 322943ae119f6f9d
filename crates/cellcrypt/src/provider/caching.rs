//! [`CachingKeyStoreProvider`]: memoises unwrap and verify calls.

use std::fmt;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{KeyEncryptionKeyAlgorithm, KeyStoreProvider};
use crate::cache::BoundedCache;
use crate::config::CryptoConfig;

type UnwrapKey = (String, Vec<u8>);
type VerifyKey = (String, bool, Vec<u8>);

/// Wraps any provider and caches the results of its two read-side calls.
///
/// Unwrapped keys are cached by `(key path, wrapped bytes)`; verification
/// results by `(key path, allow_enclave_computations, signature)`. Failures are
/// never cached. `wrap_key` and `sign` always reach the inner provider.
pub struct CachingKeyStoreProvider<P> {
    inner: P,
    unwrapped: BoundedCache<UnwrapKey, Zeroizing<Vec<u8>>>,
    verified: BoundedCache<VerifyKey, bool>,
}

impl<P: KeyStoreProvider> CachingKeyStoreProvider<P> {
    pub fn new(inner: P, unwrap_capacity: usize, signature_capacity: usize) -> Self {
        Self {
            inner,
            unwrapped: BoundedCache::new(unwrap_capacity),
            verified: BoundedCache::new(signature_capacity),
        }
    }

    /// Use the capacities from `config`.
    pub fn from_config(inner: P, config: &CryptoConfig) -> Self {
        Self::new(
            inner,
            config.unwrapped_key_cache_capacity,
            config.signature_cache_capacity,
        )
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cached_keys(&self) -> usize {
        self.unwrapped.len()
    }

    pub fn cached_signatures(&self) -> usize {
        self.verified.len()
    }

    /// Drop every cached key and verification result.
    pub fn clear(&self) {
        self.unwrapped.clear();
        self.verified.clear();
    }
}

impl<P: KeyStoreProvider> KeyStoreProvider for CachingKeyStoreProvider<P> {
    fn provider_name(&self) -> String {
        self.inner.provider_name()
    }

    fn wrap_key(
        &self,
        key_path: &str,
        algorithm: KeyEncryptionKeyAlgorithm,
        key: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        self.inner.wrap_key(key_path, algorithm, key)
    }

    fn unwrap_key(
        &self,
        key_path: &str,
        algorithm: KeyEncryptionKeyAlgorithm,
        wrapped_key: &[u8],
    ) -> anyhow::Result<Zeroizing<Vec<u8>>> {
        self.unwrapped
            .get_or_try_insert_with((key_path.to_owned(), wrapped_key.to_vec()), || {
                debug!(
                    provider = %self.inner.provider_name(),
                    key_path = %key_path,
                    wrapped_len = wrapped_key.len(),
                    "unwrapped key cache miss"
                );
                self.inner.unwrap_key(key_path, algorithm, wrapped_key)
            })
    }

    fn sign(&self, key_path: &str, allow_enclave_computations: bool) -> anyhow::Result<Vec<u8>> {
        self.inner.sign(key_path, allow_enclave_computations)
    }

    fn verify(
        &self,
        key_path: &str,
        allow_enclave_computations: bool,
        signature: &[u8],
    ) -> anyhow::Result<bool> {
        let key = (key_path.to_owned(), allow_enclave_computations, signature.to_vec());
        self.verified.get_or_try_insert_with(key, || {
            debug!(key_path = %key_path, "signature verification cache miss");
            let valid = self
                .inner
                .verify(key_path, allow_enclave_computations, signature)?;
            if !valid {
                warn!(key_path = %key_path, "key metadata signature did not verify");
            }
            Ok(valid)
        })
    }
}

impl<P: KeyStoreProvider> fmt::Debug for CachingKeyStoreProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingKeyStoreProvider")
            .field("provider", &self.inner.provider_name())
            .field("cached_keys", &self.unwrapped.len())
            .field("cached_signatures", &self.verified.len())
            .finish()
    }
}
