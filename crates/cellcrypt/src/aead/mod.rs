//! AEAD_AES_256_CBC_HMAC_SHA256 cell encryption.
//!
//! # Ciphertext format
//!
//! ```text
//! [0]        version byte (0x01)
//! [1..33)    HMAC-SHA256 tag (only when the tag is enabled, the default)
//! [..+16)    IV
//! [..end)    AES-256-CBC ciphertext, PKCS#7 padded
//! ```
//!
//! The tag covers `version ‖ IV ‖ ciphertext ‖ 0x01`, the trailing byte being
//! the length of the version field. The layout is shared with database engines
//! that decrypt independently, so it must stay bit-exact.

pub mod algorithm;
pub mod cache;

pub use algorithm::AeadAes256CbcHmacSha256;
pub use cache::AlgorithmCache;

/// The only ciphertext version defined so far.
pub const ALGORITHM_VERSION: u8 = 0x01;

/// AES block size, which is also the IV length.
pub const BLOCK_SIZE: usize = 16;

pub const IV_LEN: usize = BLOCK_SIZE;

/// HMAC-SHA256 output length.
pub const TAG_LEN: usize = 32;

/// Version byte, IV and one padded block.
pub const MIN_CIPHERTEXT_LEN_WITHOUT_TAG: usize = 1 + IV_LEN + BLOCK_SIZE;

pub const MIN_CIPHERTEXT_LEN: usize = MIN_CIPHERTEXT_LEN_WITHOUT_TAG + TAG_LEN;
