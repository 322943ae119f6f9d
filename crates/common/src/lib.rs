//! Common types, value model, and errors shared across `cellcrypt` crates.

pub mod encoding;
pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use types::{EncryptionType, TypeSpec};
pub use value::{Decimal, Value};
