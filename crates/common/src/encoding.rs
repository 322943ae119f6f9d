//! Byte-array ⇄ text helpers for persisting keys and ciphertext as strings.
//!
//! Base64 uses the standard alphabet with padding; hex output is upper-case and
//! hex input is accepted in either case.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn from_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| Error::InvalidEncoding(format!("base64: {e}")))
}

pub fn to_base64_all<I, B>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    items.into_iter().map(|b| to_base64(b.as_ref())).collect()
}

/// Decode every string, failing on the first malformed one.
pub fn from_base64_all<I, S>(items: I) -> Result<Vec<Vec<u8>>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| from_base64(s.as_ref())).collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Decode hex text; an optional `0x` prefix is ignored.
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(digits).map_err(|e| Error::InvalidEncoding(format!("hex: {e}")))
}

pub fn to_hex_all<I, B>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    items.into_iter().map(|b| to_hex(b.as_ref())).collect()
}

pub fn from_hex_all<I, S>(items: I) -> Result<Vec<Vec<u8>>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| from_hex(s.as_ref())).collect()
}
