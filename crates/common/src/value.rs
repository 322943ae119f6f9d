//! Typed column values accepted by the codecs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Largest precision (total significant digits) a [`Decimal`] can carry.
pub const MAX_PRECISION: u8 = 38;

const MAX_MAGNITUDE: u128 = 99_999_999_999_999_999_999_999_999_999_999_999_999;

/// Powers of ten up to 10^38, the largest that fits the magnitude range.
pub fn pow10(exp: u8) -> u128 {
    10u128.pow(u32::from(exp))
}

/// Exact fixed-point decimal: a sign, an integer magnitude below 10^38, and a
/// scale (number of fractional digits).
///
/// Equality is representational: `1.0` (scale 1) and `1.00` (scale 2) differ.
/// Use [`Decimal::rescale`] before comparing values of different scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal {
    negative: bool,
    magnitude: u128,
    scale: u8,
}

impl Decimal {
    /// Build from a signed mantissa and scale, e.g. `(12345, 2)` is `123.45`.
    pub fn new(mantissa: i128, scale: u8) -> Result<Self> {
        Self::from_parts(mantissa < 0, mantissa.unsigned_abs(), scale)
    }

    pub fn from_parts(negative: bool, magnitude: u128, scale: u8) -> Result<Self> {
        if scale > MAX_PRECISION {
            return Err(Error::InvalidPrecisionOrScale(format!(
                "scale {scale} exceeds the maximum of {MAX_PRECISION}"
            )));
        }
        if magnitude > MAX_MAGNITUDE {
            return Err(Error::InvalidPrecisionOrScale(format!(
                "more than {MAX_PRECISION} significant digits"
            )));
        }
        Ok(Self {
            // Normalise negative zero.
            negative: negative && magnitude != 0,
            magnitude,
            scale,
        })
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn magnitude(&self) -> u128 {
        self.magnitude
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn mantissa(&self) -> i128 {
        // magnitude < 10^38 < i128::MAX, so the cast is lossless.
        let m = self.magnitude as i128;
        if self.negative {
            -m
        } else {
            m
        }
    }

    /// Number of digits left of the decimal point (zero for `0.xx`).
    pub fn integer_digits(&self) -> u8 {
        count_digits(self.magnitude / pow10(self.scale))
    }

    /// Convert to `scale` fractional digits.
    ///
    /// Growing the scale is exact and fails only if the result would exceed
    /// [`MAX_PRECISION`] digits. Shrinking rounds half away from zero.
    pub fn rescale(&self, scale: u8) -> Result<Self> {
        if scale > MAX_PRECISION {
            return Err(Error::InvalidPrecisionOrScale(format!(
                "scale {scale} exceeds the maximum of {MAX_PRECISION}"
            )));
        }
        if scale >= self.scale {
            let magnitude = self
                .magnitude
                .checked_mul(pow10(scale - self.scale))
                .filter(|m| *m <= MAX_MAGNITUDE)
                .ok_or_else(|| {
                    Error::InvalidPrecisionOrScale(format!(
                        "{self} cannot be represented with scale {scale}"
                    ))
                })?;
            return Self::from_parts(self.negative, magnitude, scale);
        }
        let divisor = pow10(self.scale - scale);
        let mut magnitude = self.magnitude / divisor;
        if (self.magnitude % divisor) * 2 >= divisor {
            magnitude += 1;
        }
        Self::from_parts(self.negative, magnitude, scale)
    }
}

fn count_digits(mut n: u128) -> u8 {
    let mut digits = 0;
    while n > 0 {
        n /= 10;
        digits += 1;
    }
    digits
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Self {
            negative: v < 0,
            magnitude: u128::from(v.unsigned_abs()),
            scale: 0,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.magnitude.to_string();
        let scale = usize::from(self.scale);
        if self.negative {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{int}.{frac}")
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (int, frac) = body.split_once('.').unwrap_or((body, ""));
        if int.is_empty() && frac.is_empty() {
            return Err(Error::UnsupportedTypeConversion(format!(
                "'{s}' is not a decimal literal"
            )));
        }
        let scale = u8::try_from(frac.len())
            .ok()
            .filter(|sc| *sc <= MAX_PRECISION)
            .ok_or_else(|| {
                Error::InvalidPrecisionOrScale(format!("'{s}' has too many fractional digits"))
            })?;

        let mut magnitude: u128 = 0;
        for c in int.chars().chain(frac.chars()) {
            let d = c.to_digit(10).ok_or_else(|| {
                Error::UnsupportedTypeConversion(format!("'{s}' is not a decimal literal"))
            })?;
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add(u128::from(d)))
                .filter(|m| *m <= MAX_MAGNITUDE)
                .ok_or_else(|| {
                    Error::InvalidPrecisionOrScale(format!(
                        "'{s}' has more than {MAX_PRECISION} significant digits"
                    ))
                })?;
        }
        Self::from_parts(negative, magnitude, scale)
    }
}

impl TryFrom<String> for Decimal {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Decimal> for String {
    fn from(d: Decimal) -> Self {
        d.to_string()
    }
}

/// A typed column value.
///
/// `money` and `smallmoney` columns use [`Value::Decimal`]. All three
/// date-time column families (`datetime2`, `datetime`, `smalldatetime`) use
/// [`Value::DateTime`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    U8(u8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Guid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::Guid(_) => "guid",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::DateTimeOffset(_) => "datetimeoffset",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }

    /// The value as an `i64` if it belongs to the integer family.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Bool(b) => Some(i64::from(b)),
            Value::U8(v) => Some(i64::from(v)),
            Value::I16(v) => Some(i64::from(v)),
            Value::I32(v) => Some(i64::from(v)),
            Value::I64(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    u8 => U8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    Uuid => Guid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    String => String,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}
