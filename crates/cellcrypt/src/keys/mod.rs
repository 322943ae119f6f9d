//! Key hierarchy: root key → derived subkeys, key-encryption keys, and
//! protected (envelope-encrypted) data keys.
//!
//! # Lifecycle
//!
//! 1. A [`KeyEncryptionKey`] names a key held by an external
//!    [`KeyStoreProvider`](crate::provider::KeyStoreProvider) and carries the
//!    provider's signature over its path.
//! 2. A [`ProtectedDataEncryptionKey`] is either generated (random root key,
//!    wrapped through the KEK) or rebuilt from wrapped bytes (unwrapped through
//!    the KEK).
//! 3. Either way the plaintext root key feeds [`DataEncryptionKey::new`], which
//!    derives the encryption, MAC, and IV subkeys once; the DEK is immutable and
//!    shared by every encrypt/decrypt call that uses it.
//!
//! # Security invariants
//!
//! - Root keys and subkeys are zeroized on drop and never logged or printed.
//! - Equality and cache keys use a SHA-256 fingerprint, never the key itself.

pub mod dek;
pub mod kek;
pub mod protected;

pub use dek::{DataEncryptionKey, KEY_LEN};
pub use kek::KeyEncryptionKey;
pub use protected::ProtectedDataEncryptionKey;
