//! Type codecs: typed values to the byte layouts that are encrypted.
//!
//! A [`Codec`] is one configured column type. Serializing produces exactly the
//! bytes a database engine expects for that type, so ciphertext produced here
//! can be decrypted and interpreted on the server side, and vice versa.
//!
//! Codecs are built from a [`TypeSpec`] by the factories in
//! [`CodecRegistry`](crate::registry::CodecRegistry).

pub mod binary;
pub mod decimal;
pub mod guid;
pub mod numeric;
pub mod temporal;
pub mod text;

use common::{Error, Result, TypeSpec, Value};

pub use binary::BinaryCodec;
pub use decimal::MoneyKind;
pub use numeric::IntegerWidth;
pub use text::{CharCodec, CharKind, TextEncoding};

/// One configured column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codec {
    Integer(IntegerWidth),
    Real,
    Float,
    Decimal { precision: u8, scale: u8 },
    Money(MoneyKind),
    Guid,
    Date,
    Time { scale: u8 },
    DateTime2 { scale: u8 },
    DateTimeOffset { scale: u8 },
    DateTime,
    SmallDateTime,
    Char(CharCodec),
    Binary(BinaryCodec),
}

impl Codec {
    /// `decimal(p, s)`; precision defaults to 18 and scale to 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrecisionOrScale`] outside 1..=38 / 0..=p.
    pub fn decimal(spec: &TypeSpec) -> Result<Self> {
        let precision = spec.precision.unwrap_or(decimal::DEFAULT_PRECISION);
        let scale = spec.scale.unwrap_or(0);
        decimal::check_precision(precision, scale)?;
        Ok(Codec::Decimal { precision, scale })
    }

    /// Fractional-second scale for the time family, defaulting to 7.
    fn time_scale(spec: &TypeSpec) -> Result<u8> {
        let scale = spec.scale.unwrap_or(temporal::DEFAULT_TIME_SCALE);
        temporal::check_time_scale(scale)?;
        Ok(scale)
    }

    pub fn time(spec: &TypeSpec) -> Result<Self> {
        Ok(Codec::Time {
            scale: Self::time_scale(spec)?,
        })
    }

    pub fn datetime2(spec: &TypeSpec) -> Result<Self> {
        Ok(Codec::DateTime2 {
            scale: Self::time_scale(spec)?,
        })
    }

    pub fn datetimeoffset(spec: &TypeSpec) -> Result<Self> {
        Ok(Codec::DateTimeOffset {
            scale: Self::time_scale(spec)?,
        })
    }

    pub fn char(kind: CharKind, spec: &TypeSpec) -> Result<Self> {
        CharCodec::new(kind, spec.size, spec.codepage).map(Codec::Char)
    }

    pub fn binary(fixed: bool, spec: &TypeSpec) -> Result<Self> {
        BinaryCodec::new(fixed, spec.size).map(Codec::Binary)
    }

    /// Check the parameters of a codec built directly from its variants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrecisionOrScale`] for a decimal precision or
    /// scale, or a fractional-second scale, outside the type's range.
    pub fn validate(&self) -> Result<()> {
        match self {
            Codec::Decimal { precision, scale } => decimal::check_precision(*precision, *scale),
            Codec::Time { scale }
            | Codec::DateTime2 { scale }
            | Codec::DateTimeOffset { scale } => temporal::check_time_scale(*scale),
            _ => Ok(()),
        }
    }

    /// The type identifier this codec serves.
    pub fn type_id(&self) -> &'static str {
        match self {
            Codec::Integer(w) => w.type_id(),
            Codec::Real => "real",
            Codec::Float => "float",
            Codec::Decimal { .. } => "decimal",
            Codec::Money(kind) => kind.type_id(),
            Codec::Guid => "uniqueidentifier",
            Codec::Date => "date",
            Codec::Time { .. } => "time",
            Codec::DateTime2 { .. } => "datetime2",
            Codec::DateTimeOffset { .. } => "datetimeoffset",
            Codec::DateTime => "datetime",
            Codec::SmallDateTime => "smalldatetime",
            Codec::Char(c) => c.kind().type_id(),
            Codec::Binary(b) => b.type_id(),
        }
    }

    /// Normalize `value` into this type's byte layout.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedTypeConversion`] when the value variant does not
    /// belong to this type, otherwise the type's own range and length errors.
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        self.validate()?;
        match self {
            Codec::Integer(w) => numeric::serialize_integer(*w, value),
            Codec::Real => numeric::serialize_real(value),
            Codec::Float => numeric::serialize_float(value),
            Codec::Decimal { precision, scale } => {
                decimal::serialize_decimal(*precision, *scale, value)
            }
            Codec::Money(kind) => decimal::serialize_money(*kind, value),
            Codec::Guid => guid::serialize_guid(value),
            Codec::Date => temporal::serialize_date(value),
            Codec::Time { scale } => temporal::serialize_time(*scale, value),
            Codec::DateTime2 { scale } => temporal::serialize_datetime2(*scale, value),
            Codec::DateTimeOffset { scale } => temporal::serialize_datetimeoffset(*scale, value),
            Codec::DateTime => temporal::serialize_datetime(value),
            Codec::SmallDateTime => temporal::serialize_smalldatetime(value),
            Codec::Char(c) => c.serialize(value),
            Codec::Binary(b) => b.serialize(value),
        }
    }

    /// Rebuild a value from this type's byte layout.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        self.validate()?;
        match self {
            Codec::Integer(w) => numeric::deserialize_integer(*w, bytes),
            Codec::Real => numeric::deserialize_real(bytes),
            Codec::Float => numeric::deserialize_float(bytes),
            Codec::Decimal { precision, scale } => {
                decimal::deserialize_decimal(*precision, *scale, bytes)
            }
            Codec::Money(kind) => decimal::deserialize_money(*kind, bytes),
            Codec::Guid => guid::deserialize_guid(bytes),
            Codec::Date => temporal::deserialize_date(bytes),
            Codec::Time { scale } => temporal::deserialize_time(*scale, bytes),
            Codec::DateTime2 { scale } => temporal::deserialize_datetime2(*scale, bytes),
            Codec::DateTimeOffset { scale } => {
                temporal::deserialize_datetimeoffset(*scale, bytes)
            }
            Codec::DateTime => temporal::deserialize_datetime(bytes),
            Codec::SmallDateTime => temporal::deserialize_smalldatetime(bytes),
            Codec::Char(c) => c.deserialize(bytes),
            Codec::Binary(b) => b.deserialize(bytes),
        }
    }
}

/// The value variant does not belong to `type_id`.
pub(crate) fn mismatch(type_id: &str, value: &Value) -> Error {
    Error::UnsupportedTypeConversion(format!(
        "{type_id} cannot hold a {} value",
        value.type_name()
    ))
}

/// Require exactly `N` bytes.
pub(crate) fn expect_len<const N: usize>(type_id: &str, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        Error::InvalidLength(format!(
            "{type_id} needs {N} bytes, got {}",
            bytes.len()
        ))
    })
}
