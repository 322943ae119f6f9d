//! [`DataEncryptionKey`]: a root key plus its three derived subkeys.

use std::fmt;
use std::hash::{Hash, Hasher};

use common::encoding::to_base64;
use common::{Error, Result};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Byte length of a root key and of every derived subkey (256 bits).
pub const KEY_LEN: usize = 32;

const ENCRYPTION_KEY_SALT: &str = "Microsoft SQL Server cell encryption key with encryption algorithm:AEAD_AES_256_CBC_HMAC_SHA256 and key length:256";
const MAC_KEY_SALT: &str = "Microsoft SQL Server cell MAC key with encryption algorithm:AEAD_AES_256_CBC_HMAC_SHA256 and key length:256";
const IV_KEY_SALT: &str = "Microsoft SQL Server cell IV key with encryption algorithm:AEAD_AES_256_CBC_HMAC_SHA256 and key length:256";

type HmacSha256 = Hmac<Sha256>;
type KeyBytes = Zeroizing<[u8; KEY_LEN]>;

/// A symmetric data key: the root key and the subkeys derived from it.
///
/// The root key is kept only to fingerprint it; encryption uses the subkeys.
pub struct DataEncryptionKey {
    name: String,
    root_key: KeyBytes,
    encryption_key: KeyBytes,
    mac_key: KeyBytes,
    iv_key: KeyBytes,
    fingerprint: String,
}

impl DataEncryptionKey {
    /// Build a DEK from raw root key material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeySize`] unless `root_key` is exactly
    /// [`KEY_LEN`] bytes.
    pub fn new(name: impl Into<String>, root_key: &[u8]) -> Result<Self> {
        let root: [u8; KEY_LEN] = root_key.try_into().map_err(|_| Error::InvalidKeySize {
            expected: KEY_LEN,
            actual: root_key.len(),
        })?;
        let root_key = Zeroizing::new(root);

        let encryption_key = derive_subkey(&root_key, ENCRYPTION_KEY_SALT)?;
        let mac_key = derive_subkey(&root_key, MAC_KEY_SALT)?;
        let iv_key = derive_subkey(&root_key, IV_KEY_SALT)?;
        let fingerprint = to_base64(&Sha256::digest(root_key.as_slice()));

        Ok(Self {
            name: name.into(),
            root_key,
            encryption_key,
            mac_key,
            iv_key,
            fingerprint,
        })
    }

    /// Build a DEK around a fresh root key from the OS CSPRNG.
    pub fn generate(name: impl Into<String>) -> Result<Self> {
        let root = generate_root_key();
        Self::new(name, root.as_slice())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base64 SHA-256 of the root key. Safe to log and to use as a map key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Short identifier for error messages: the name and a fingerprint prefix.
    pub fn key_hint(&self) -> String {
        let prefix: String = self.fingerprint.chars().take(8).collect();
        format!("'{}' ({prefix})", self.name)
    }

    pub(crate) fn encryption_key(&self) -> &[u8; KEY_LEN] {
        &self.encryption_key
    }

    pub(crate) fn mac_key(&self) -> &[u8; KEY_LEN] {
        &self.mac_key
    }

    pub(crate) fn iv_key(&self) -> &[u8; KEY_LEN] {
        &self.iv_key
    }

    pub(crate) fn root_key(&self) -> &[u8; KEY_LEN] {
        &self.root_key
    }
}

/// `HMAC-SHA256(key = root, message = UTF-16LE(salt))`.
fn derive_subkey(root: &[u8; KEY_LEN], salt: &str) -> Result<KeyBytes> {
    let salt_bytes: Vec<u8> = salt.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let mut mac = HmacSha256::new_from_slice(root).map_err(|_| Error::InvalidKeySize {
        expected: KEY_LEN,
        actual: root.len(),
    })?;
    mac.update(&salt_bytes);
    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// 32 random bytes from the OS CSPRNG, zeroized on drop.
pub(crate) fn generate_root_key() -> KeyBytes {
    let mut root = Zeroizing::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(root.as_mut_slice());
    root
}

impl PartialEq for DataEncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for DataEncryptionKey {}

impl Hash for DataEncryptionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

impl fmt::Debug for DataEncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.debug_struct("DataEncryptionKey")
            .field("name", &self.name)
            .field("fingerprint", &self.fingerprint)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}
