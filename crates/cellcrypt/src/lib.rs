//! Client-side cell encryption.
//!
//! Values are normalised to the byte layout of their column type by a
//! [`Codec`], then sealed with [`AeadAes256CbcHmacSha256`] under a
//! [`DataEncryptionKey`]. Data keys are themselves wrapped by a
//! [`KeyEncryptionKey`] held in an external [`KeyStoreProvider`].
//!
//! [`CryptoContext`] is the entry point for most callers:
//!
//! ```
//! use std::sync::Arc;
//! use cellcrypt::{CryptoContext, DataEncryptionKey, EncryptionType, TypeSpec, Value};
//!
//! let ctx = CryptoContext::default();
//! let key = Arc::new(DataEncryptionKey::generate("cek")?);
//! let settings = ctx.settings(key, EncryptionType::Deterministic, &TypeSpec::new("int"))?;
//! let ciphertext = ctx.encrypt(&Value::I32(42), &settings)?;
//! assert_eq!(ctx.decrypt(&ciphertext, &settings)?, Value::I32(42));
//! # Ok::<(), cellcrypt::Error>(())
//! ```

pub mod aead;
pub mod cache;
pub mod codec;
pub mod config;
pub mod context;
pub mod keys;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod telemetry;

pub use aead::{AeadAes256CbcHmacSha256, AlgorithmCache};
pub use codec::Codec;
pub use common::{encoding, Decimal, EncryptionType, Error, Result, TypeSpec, Value};
pub use config::CryptoConfig;
pub use context::CryptoContext;
pub use keys::{DataEncryptionKey, KeyEncryptionKey, ProtectedDataEncryptionKey};
pub use provider::{
    CachingKeyStoreProvider, InMemoryKeyStoreProvider, KeyEncryptionKeyAlgorithm,
    KeyStoreProvider,
};
pub use registry::CodecRegistry;
pub use settings::EncryptionSettings;
