//! The AES-256-CBC + HMAC-SHA256 engine bound to one data key and mode.
//!
//! **Deterministic mode** derives the IV from the plaintext, so equal values
//! encrypt to equal ciphertext. This is what makes equality lookups on
//! encrypted columns possible, and it leaks exactly that equality.

use std::sync::Arc;

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use common::{EncryptionType, Error, Result};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use tracing::warn;

use super::{
    ALGORITHM_VERSION, BLOCK_SIZE, IV_LEN, MIN_CIPHERTEXT_LEN, MIN_CIPHERTEXT_LEN_WITHOUT_TAG,
    TAG_LEN,
};
use crate::keys::DataEncryptionKey;

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Length of the version field, mixed into the tag as a single byte.
const VERSION_LEN_BYTE: u8 = 0x01;

/// Stateless per call; share one instance across threads.
#[derive(Debug, Clone)]
pub struct AeadAes256CbcHmacSha256 {
    key: Arc<DataEncryptionKey>,
    encryption_type: EncryptionType,
}

impl AeadAes256CbcHmacSha256 {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for [`EncryptionType::Plaintext`].
    pub fn new(key: Arc<DataEncryptionKey>, encryption_type: EncryptionType) -> Result<Self> {
        if encryption_type == EncryptionType::Plaintext {
            return Err(Error::InvalidConfiguration(
                "plaintext settings cannot build an encryption algorithm".into(),
            ));
        }
        Ok(Self {
            key,
            encryption_type,
        })
    }

    pub fn key(&self) -> &Arc<DataEncryptionKey> {
        &self.key
    }

    pub fn encryption_type(&self) -> EncryptionType {
        self.encryption_type
    }

    /// Encrypt with an authentication tag.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.encrypt_with_tag(plaintext, true)
    }

    /// Encrypt, optionally leaving out the authentication tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncryptionFailed`] if the cipher or MAC cannot be keyed.
    pub fn encrypt_with_tag(&self, plaintext: &[u8], has_tag: bool) -> Result<Vec<u8>> {
        let iv = match self.encryption_type {
            EncryptionType::Deterministic => self.derive_iv(plaintext)?,
            _ => random_iv(),
        };

        let cipher = Aes256CbcEnc::new_from_slices(self.key.encryption_key(), &iv)
            .map_err(|e| self.encryption_failed(e))?;
        let body = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let tag_len = if has_tag { TAG_LEN } else { 0 };
        let mut out = Vec::with_capacity(1 + tag_len + IV_LEN + body.len());
        out.push(ALGORITHM_VERSION);
        if has_tag {
            let tag = self
                .compute_tag(&iv, &body)
                .map_err(|e| self.encryption_failed(e))?;
            out.extend_from_slice(&tag);
        }
        out.extend_from_slice(&iv);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decrypt a tagged ciphertext.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.decrypt_with_tag(ciphertext, true)
    }

    /// Decrypt, with `has_tag` matching the flag used to encrypt.
    ///
    /// Length and version are checked before any key material is used, and a
    /// tag mismatch fails before the block cipher runs.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCiphertextLength`] below the minimum length.
    /// - [`Error::UnsupportedAlgorithmVersion`] for an unknown version byte.
    /// - [`Error::AuthenticationFailed`] on tag mismatch.
    /// - [`Error::DecryptionFailed`] on bad block alignment or padding.
    pub fn decrypt_with_tag(&self, ciphertext: &[u8], has_tag: bool) -> Result<Vec<u8>> {
        let minimum = if has_tag {
            MIN_CIPHERTEXT_LEN
        } else {
            MIN_CIPHERTEXT_LEN_WITHOUT_TAG
        };
        if ciphertext.len() < minimum {
            return Err(Error::InvalidCiphertextLength {
                actual: ciphertext.len(),
                minimum,
            });
        }

        match ciphertext[0] {
            ALGORITHM_VERSION => self.decrypt_v1(&ciphertext[1..], has_tag),
            other => Err(Error::UnsupportedAlgorithmVersion(other)),
        }
    }

    /// `payload` is everything after the version byte.
    fn decrypt_v1(&self, payload: &[u8], has_tag: bool) -> Result<Vec<u8>> {
        let (tag, rest) = if has_tag {
            let (tag, rest) = payload.split_at(TAG_LEN);
            (Some(tag), rest)
        } else {
            (None, payload)
        };
        let (iv, body) = rest.split_at(IV_LEN);

        if let Some(tag) = tag {
            let mac = self.mac_for(iv, body).map_err(|e| self.decryption_failed(e))?;
            if mac.verify_slice(tag).is_err() {
                warn!(key = %self.key.name(), "authentication tag mismatch");
                return Err(Error::AuthenticationFailed {
                    key_hint: self.key.key_hint(),
                });
            }
        }

        if body.len() % BLOCK_SIZE != 0 {
            return Err(self.decryption_failed(format!(
                "ciphertext body of {} bytes is not a multiple of the block size",
                body.len()
            )));
        }

        let cipher = Aes256CbcDec::new_from_slices(self.key.encryption_key(), iv)
            .map_err(|e| self.decryption_failed(e))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|_| self.decryption_failed("invalid padding"))
    }

    /// `HMAC-SHA256(ivKey, plaintext)` truncated to one block.
    fn derive_iv(&self, plaintext: &[u8]) -> Result<[u8; IV_LEN]> {
        let mut mac = HmacSha256::new_from_slice(self.key.iv_key())
            .map_err(|e| self.encryption_failed(e))?;
        mac.update(plaintext);
        let digest = mac.finalize().into_bytes();
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&digest[..IV_LEN]);
        Ok(iv)
    }

    fn compute_tag(&self, iv: &[u8], body: &[u8]) -> std::result::Result<[u8; TAG_LEN], String> {
        let mac = self.mac_for(iv, body)?;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(tag)
    }

    /// MAC state over `version ‖ iv ‖ body ‖ version length`.
    fn mac_for(&self, iv: &[u8], body: &[u8]) -> std::result::Result<HmacSha256, String> {
        let mut mac =
            HmacSha256::new_from_slice(self.key.mac_key()).map_err(|e| e.to_string())?;
        mac.update(&[ALGORITHM_VERSION]);
        mac.update(iv);
        mac.update(body);
        mac.update(&[VERSION_LEN_BYTE]);
        Ok(mac)
    }

    fn encryption_failed(&self, reason: impl ToString) -> Error {
        Error::EncryptionFailed {
            key_hint: self.key.key_hint(),
            reason: reason.to_string(),
        }
    }

    fn decryption_failed(&self, reason: impl ToString) -> Error {
        Error::DecryptionFailed {
            key_hint: self.key.key_hint(),
            reason: reason.to_string(),
        }
    }
}

fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}
