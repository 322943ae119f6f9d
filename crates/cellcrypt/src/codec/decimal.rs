//! `decimal`/`numeric` and `money`/`smallmoney` codecs.
//!
//! Decimal layout: `[scale][length][sign][magnitude LE]`, where the magnitude
//! width is 4, 8, 12 or 16 bytes depending on the declared precision and the
//! sign byte is 1 for positive, 0 for negative.
//!
//! Money layout: the value in ten-thousandths as an `i64`, written as its high
//! 32 bits followed by its low 32 bits (each little-endian).

use common::value::{pow10, MAX_PRECISION};
use common::{Decimal, Error, Result, Value};

use super::{expect_len, mismatch};

/// Fractional digits carried by `money` and `smallmoney`.
pub const MONEY_SCALE: u8 = 4;

/// Default precision for `decimal` when none is given.
pub const DEFAULT_PRECISION: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoneyKind {
    Money,
    SmallMoney,
}

impl MoneyKind {
    pub fn type_id(&self) -> &'static str {
        match self {
            MoneyKind::Money => "money",
            MoneyKind::SmallMoney => "smallmoney",
        }
    }

    /// Bounds in ten-thousandths.
    fn range(&self) -> (i64, i64) {
        match self {
            MoneyKind::Money => (i64::MIN, i64::MAX),
            MoneyKind::SmallMoney => (i64::from(i32::MIN), i64::from(i32::MAX)),
        }
    }
}

/// Reject precision outside 1..=38 or scale above precision.
pub(crate) fn check_precision(precision: u8, scale: u8) -> Result<()> {
    if precision == 0 || precision > MAX_PRECISION {
        return Err(Error::InvalidPrecisionOrScale(format!(
            "precision {precision} is outside 1..={MAX_PRECISION}"
        )));
    }
    if scale > precision {
        return Err(Error::InvalidPrecisionOrScale(format!(
            "scale {scale} exceeds precision {precision}"
        )));
    }
    Ok(())
}

/// Magnitude width in bytes for a precision.
fn magnitude_len(precision: u8) -> usize {
    match precision {
        0..=9 => 4,
        10..=19 => 8,
        20..=28 => 12,
        _ => 16,
    }
}

fn to_decimal(type_id: &str, value: &Value) -> Result<Decimal> {
    match value {
        Value::Decimal(d) => Ok(*d),
        Value::Bool(_) => Err(mismatch(type_id, value)),
        other => other
            .as_integer()
            .map(Decimal::from)
            .ok_or_else(|| mismatch(type_id, value)),
    }
}

pub(crate) fn serialize_decimal(precision: u8, scale: u8, value: &Value) -> Result<Vec<u8>> {
    let d = to_decimal("decimal", value)?;
    let integer_digits = d.integer_digits();
    if integer_digits > precision - scale {
        return Err(Error::InvalidPrecisionOrScale(format!(
            "{d} has {integer_digits} integer digits, decimal({precision},{scale}) allows {}",
            precision - scale
        )));
    }
    let d = d.rescale(scale)?;
    // Rounding up can add a digit, e.g. 9.995 into decimal(3,2).
    if d.magnitude() >= pow10(precision) {
        return Err(Error::InvalidPrecisionOrScale(format!(
            "{d} does not fit decimal({precision},{scale})"
        )));
    }

    let len = magnitude_len(precision);
    let mut out = Vec::with_capacity(3 + len);
    out.push(scale);
    // `len` is at most 16.
    out.push(len as u8);
    out.push(u8::from(!d.is_negative()));
    out.extend_from_slice(&d.magnitude().to_le_bytes()[..len]);
    Ok(out)
}

pub(crate) fn deserialize_decimal(precision: u8, scale: u8, bytes: &[u8]) -> Result<Value> {
    let len = magnitude_len(precision);
    if bytes.len() != 3 + len {
        return Err(Error::InvalidLength(format!(
            "decimal({precision},{scale}) needs {} bytes, got {}",
            3 + len,
            bytes.len()
        )));
    }
    if bytes[0] != scale {
        return Err(Error::InvalidPrecisionOrScale(format!(
            "encoded scale {} does not match declared scale {scale}",
            bytes[0]
        )));
    }
    if usize::from(bytes[1]) != len {
        return Err(Error::InvalidLength(format!(
            "encoded magnitude length {} does not match {len}",
            bytes[1]
        )));
    }
    let negative = match bytes[2] {
        0 => true,
        1 => false,
        other => {
            return Err(Error::ValueOutOfRange(format!("invalid decimal sign byte {other}")))
        }
    };

    let mut raw = [0u8; 16];
    raw[..len].copy_from_slice(&bytes[3..]);
    let magnitude = u128::from_le_bytes(raw);
    if magnitude >= pow10(precision) {
        return Err(Error::InvalidPrecisionOrScale(format!(
            "encoded magnitude exceeds precision {precision}"
        )));
    }
    Ok(Value::Decimal(Decimal::from_parts(negative, magnitude, scale)?))
}

pub(crate) fn serialize_money(kind: MoneyKind, value: &Value) -> Result<Vec<u8>> {
    let d = to_decimal(kind.type_id(), value)?;
    let out_of_range =
        || Error::ValueOutOfRange(format!("{d} is outside the {} range", kind.type_id()));

    // Anything with more than 15 integer digits cannot be a money value, and
    // checking first keeps the rescale below from overflowing.
    if d.integer_digits() > 15 {
        return Err(out_of_range());
    }
    let units = i64::try_from(d.rescale(MONEY_SCALE)?.mantissa()).map_err(|_| out_of_range())?;
    let (min, max) = kind.range();
    if units < min || units > max {
        return Err(out_of_range());
    }

    // `as` keeps the two's-complement halves.
    let high = (units >> 32) as i32;
    let low = units as u32;
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&high.to_le_bytes());
    out.extend_from_slice(&low.to_le_bytes());
    Ok(out)
}

pub(crate) fn deserialize_money(kind: MoneyKind, bytes: &[u8]) -> Result<Value> {
    let raw: [u8; 8] = expect_len(kind.type_id(), bytes)?;
    let high = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let low = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
    let units = (i64::from(high) << 32) | i64::from(low);

    let (min, max) = kind.range();
    if units < min || units > max {
        return Err(Error::ValueOutOfRange(format!(
            "{units} ten-thousandths is outside the {} range",
            kind.type_id()
        )));
    }
    Ok(Value::Decimal(Decimal::new(i128::from(units), MONEY_SCALE)?))
}
