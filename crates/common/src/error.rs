//! Error taxonomy shared by every cellcrypt layer.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type.
///
/// Messages never carry key material. Where a key must be identified for
/// diagnostics, a key hint (name plus a short fingerprint prefix) is used.
#[derive(Debug, Error)]
pub enum Error {
    /// Root key material is not exactly 32 bytes.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    /// Ciphertext shorter than the minimum length of its layout.
    #[error("invalid ciphertext length: {actual} bytes is below the minimum of {minimum} bytes")]
    InvalidCiphertextLength { actual: usize, minimum: usize },

    /// The leading version byte is not a known algorithm version.
    #[error("unsupported algorithm version 0x{0:02x}")]
    UnsupportedAlgorithmVersion(u8),

    /// The authentication tag does not match the ciphertext.
    #[error("authentication tag mismatch for key {key_hint}")]
    AuthenticationFailed { key_hint: String },

    /// The block cipher rejected the ciphertext (bad padding or block size).
    #[error("decryption failed for key {key_hint}: {reason}")]
    DecryptionFailed { key_hint: String, reason: String },

    /// The block cipher or MAC could not be initialised for encryption.
    #[error("encryption failed for key {key_hint}: {reason}")]
    EncryptionFailed { key_hint: String, reason: String },

    /// A value or byte sequence has a length the type does not allow.
    #[error("invalid length: {0}")]
    InvalidLength(String),

    /// Precision or scale is outside the range the type supports.
    #[error("invalid precision or scale: {0}")]
    InvalidPrecisionOrScale(String),

    /// A date or time is out of range or cannot be represented.
    #[error("invalid temporal value: {0}")]
    InvalidTemporalValue(String),

    /// A numeric value does not fit the target width, or is not finite.
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    /// No codec is registered for the type, or the value does not match it.
    #[error("unsupported type conversion: {0}")]
    UnsupportedTypeConversion(String),

    /// The requested code page is unknown or cannot represent the text.
    #[error("encoding unsupported: {0}")]
    EncodingUnsupported(String),

    /// Base64 or hex input could not be decoded.
    #[error("invalid text encoding: {0}")]
    InvalidEncoding(String),

    /// Missing key, plaintext settings, or otherwise unusable configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The external key store failed. The provider error is kept as the source.
    #[error("key store provider '{provider}' failed during {operation}")]
    KeyStoreProvider {
        provider: String,
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A key-encryption-key signature did not verify.
    #[error("signature verification failed for key path '{key_path}'")]
    SignatureVerificationFailed { key_path: String },
}

impl Error {
    /// Stable machine-readable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidKeySize { .. } => "invalid_key_size",
            Error::InvalidCiphertextLength { .. } => "invalid_ciphertext_length",
            Error::UnsupportedAlgorithmVersion(_) => "unsupported_algorithm_version",
            Error::AuthenticationFailed { .. } => "authentication_failed",
            Error::DecryptionFailed { .. } => "decryption_failed",
            Error::EncryptionFailed { .. } => "encryption_failed",
            Error::InvalidLength(_) => "invalid_length",
            Error::InvalidPrecisionOrScale(_) => "invalid_precision_or_scale",
            Error::InvalidTemporalValue(_) => "invalid_temporal_value",
            Error::ValueOutOfRange(_) => "value_out_of_range",
            Error::UnsupportedTypeConversion(_) => "unsupported_type_conversion",
            Error::EncodingUnsupported(_) => "encoding_unsupported",
            Error::InvalidEncoding(_) => "invalid_encoding",
            Error::InvalidConfiguration(_) => "invalid_configuration",
            Error::KeyStoreProvider { .. } => "key_store_provider_error",
            Error::SignatureVerificationFailed { .. } => "signature_verification_failed",
        }
    }

    /// Returns `true` for failures of the cryptographic envelope itself
    /// (length, version, tag, or cipher), as opposed to codec or key errors.
    pub fn is_cryptographic(&self) -> bool {
        matches!(
            self,
            Error::InvalidCiphertextLength { .. }
                | Error::UnsupportedAlgorithmVersion(_)
                | Error::AuthenticationFailed { .. }
                | Error::DecryptionFailed { .. }
                | Error::EncryptionFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            Error::AuthenticationFailed { key_hint: "k".into() }.kind(),
            "authentication_failed"
        );
        assert_eq!(Error::UnsupportedAlgorithmVersion(2).kind(), "unsupported_algorithm_version");
        assert_eq!(Error::InvalidLength("x".into()).kind(), "invalid_length");
        assert_eq!(
            Error::SignatureVerificationFailed { key_path: "p".into() }.kind(),
            "signature_verification_failed"
        );
    }

    #[test]
    fn display_includes_details() {
        let e = Error::InvalidCiphertextLength { actual: 10, minimum: 65 };
        let s = e.to_string();
        assert!(s.contains("10") && s.contains("65"), "{s}");

        let e = Error::UnsupportedAlgorithmVersion(0x02);
        assert!(e.to_string().contains("0x02"));
    }

    #[test]
    fn provider_error_keeps_source() {
        use std::error::Error as _;
        let inner: Box<dyn std::error::Error + Send + Sync> = "vault unreachable".into();
        let e = Error::KeyStoreProvider {
            provider: "IN_MEMORY".into(),
            operation: "unwrap_key",
            source: inner,
        };
        assert!(e.to_string().contains("IN_MEMORY"));
        assert_eq!(e.source().unwrap().to_string(), "vault unreachable");
    }

    #[test]
    fn cryptographic_classification() {
        assert!(Error::AuthenticationFailed { key_hint: "k".into() }.is_cryptographic());
        assert!(!Error::InvalidLength("x".into()).is_cryptographic());
    }
}
