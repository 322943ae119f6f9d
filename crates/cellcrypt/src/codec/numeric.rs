//! Integer family and IEEE floating point codecs.
//!
//! Every integer width normalizes to the same 8-byte little-endian `i64`, so
//! equal values of different source widths encrypt identically.

use common::{Error, Result, Value};

use super::{expect_len, mismatch};

/// Declared width of an integer-family column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerWidth {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
}

impl IntegerWidth {
    pub fn type_id(&self) -> &'static str {
        match self {
            IntegerWidth::Bit => "bit",
            IntegerWidth::TinyInt => "tinyint",
            IntegerWidth::SmallInt => "smallint",
            IntegerWidth::Int => "int",
            IntegerWidth::BigInt => "bigint",
        }
    }

    fn range(&self) -> (i64, i64) {
        match self {
            IntegerWidth::Bit => (0, 1),
            IntegerWidth::TinyInt => (0, i64::from(u8::MAX)),
            IntegerWidth::SmallInt => (i64::from(i16::MIN), i64::from(i16::MAX)),
            IntegerWidth::Int => (i64::from(i32::MIN), i64::from(i32::MAX)),
            IntegerWidth::BigInt => (i64::MIN, i64::MAX),
        }
    }

    fn narrow(&self, v: i64) -> Result<Value> {
        let out_of_range =
            || Error::ValueOutOfRange(format!("{v} does not fit {}", self.type_id()));
        Ok(match self {
            IntegerWidth::Bit => Value::Bool(v != 0),
            IntegerWidth::TinyInt => Value::U8(u8::try_from(v).map_err(|_| out_of_range())?),
            IntegerWidth::SmallInt => Value::I16(i16::try_from(v).map_err(|_| out_of_range())?),
            IntegerWidth::Int => Value::I32(i32::try_from(v).map_err(|_| out_of_range())?),
            IntegerWidth::BigInt => Value::I64(v),
        })
    }
}

pub(crate) fn serialize_integer(width: IntegerWidth, value: &Value) -> Result<Vec<u8>> {
    // Only `bit` takes booleans; the other widths refuse to treat them as 0/1.
    if matches!(value, Value::Bool(_)) && width != IntegerWidth::Bit {
        return Err(mismatch(width.type_id(), value));
    }
    let v = value
        .as_integer()
        .ok_or_else(|| mismatch(width.type_id(), value))?;
    let (min, max) = width.range();
    if v < min || v > max {
        return Err(Error::ValueOutOfRange(format!(
            "{v} is outside the {} range {min}..={max}",
            width.type_id()
        )));
    }
    Ok(v.to_le_bytes().to_vec())
}

/// Decode 8 bytes and narrow to `width`. For `bit`, any non-zero value is true.
pub(crate) fn deserialize_integer(width: IntegerWidth, bytes: &[u8]) -> Result<Value> {
    let raw: [u8; 8] = expect_len(width.type_id(), bytes)?;
    width.narrow(i64::from_le_bytes(raw))
}

pub(crate) fn serialize_real(value: &Value) -> Result<Vec<u8>> {
    let v = match *value {
        Value::F32(v) => v,
        _ => return Err(mismatch("real", value)),
    };
    ensure_finite("real", f64::from(v))?;
    Ok(v.to_le_bytes().to_vec())
}

pub(crate) fn deserialize_real(bytes: &[u8]) -> Result<Value> {
    let raw: [u8; 4] = expect_len("real", bytes)?;
    let v = f32::from_le_bytes(raw);
    ensure_finite("real", f64::from(v))?;
    Ok(Value::F32(v))
}

/// `float` also accepts `F32`, widening it losslessly.
pub(crate) fn serialize_float(value: &Value) -> Result<Vec<u8>> {
    let v = match *value {
        Value::F64(v) => v,
        Value::F32(v) => f64::from(v),
        _ => return Err(mismatch("float", value)),
    };
    ensure_finite("float", v)?;
    Ok(v.to_le_bytes().to_vec())
}

pub(crate) fn deserialize_float(bytes: &[u8]) -> Result<Value> {
    let raw: [u8; 8] = expect_len("float", bytes)?;
    let v = f64::from_le_bytes(raw);
    ensure_finite("float", v)?;
    Ok(Value::F64(v))
}

fn ensure_finite(type_id: &str, v: f64) -> Result<()> {
    if !v.is_finite() {
        return Err(Error::ValueOutOfRange(format!(
            "{type_id} cannot hold non-finite value {v}"
        )));
    }
    Ok(())
}
