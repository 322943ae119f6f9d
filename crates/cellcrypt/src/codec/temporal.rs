//! Date and time codecs.
//!
//! Day numbers come from chrono's proleptic Gregorian calendar, so the count
//! runs straight through 1582 with no cutover gap.
//!
//! | type                | layout                                            |
//! |---------------------|---------------------------------------------------|
//! | `date`              | days since 0001-01-01, 3 bytes                    |
//! | `time(n)`           | ticks of 10^-n s, 3/4/5 bytes for n 0-2/3-4/5-7   |
//! | `datetime2(n)`      | `time(n)` then `date`                             |
//! | `datetimeoffset(n)` | UTC `time(n)`, UTC `date`, offset minutes (`i16`) |
//! | `datetime`          | `i32` days since 1900-01-01, `u32` 1/300 s ticks  |
//! | `smalldatetime`     | `u16` days since 1900-01-01, `u16` minutes        |
//!
//! Sub-day values round half up at the column's unit. A round-up that reaches
//! midnight moves to the next day, unless the date is already the last one the
//! type allows; then the ticks are truncated instead.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use common::{Error, Result, Value};

use super::{expect_len, mismatch};

pub const MAX_TIME_SCALE: u8 = 7;

/// Scale used when a time type declares none.
pub const DEFAULT_TIME_SCALE: u8 = 7;

const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const SECONDS_PER_DAY: u64 = 86_400;
const NANOS_PER_DAY: u64 = SECONDS_PER_DAY * NANOS_PER_SECOND;

/// `datetime` ticks per day (1/300 s).
const DATETIME_TICKS_PER_DAY: u64 = SECONDS_PER_DAY * 300;
const MINUTES_PER_DAY: u64 = 1_440;
const MILLIS_PER_MINUTE: u64 = 60_000;

/// Largest offset `datetimeoffset` accepts, in minutes (14 hours).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Day number of 1900-01-01, the `datetime`/`smalldatetime` epoch.
const DAY_1900: i64 = 693_595;

const DATE_LEN: usize = 3;

/// Inclusive day-number bounds (days since 0001-01-01) for one type.
#[derive(Debug, Clone, Copy)]
struct DayRange {
    min: i64,
    max: i64,
    type_id: &'static str,
}

const DATE_RANGE: DayRange = DayRange {
    min: 0,
    max: 3_652_058,
    type_id: "date",
};

/// 1753-01-01 ..= 9999-12-31
const DATETIME_RANGE: DayRange = DayRange {
    min: 639_905,
    max: 3_652_058,
    type_id: "datetime",
};

/// 1900-01-01 ..= 2079-06-06
const SMALLDATETIME_RANGE: DayRange = DayRange {
    min: DAY_1900,
    max: DAY_1900 + 65_535,
    type_id: "smalldatetime",
};

impl DayRange {
    fn check(&self, day: i64) -> Result<i64> {
        if day < self.min || day > self.max {
            return Err(Error::InvalidTemporalValue(format!(
                "{} is outside the {} range {}..={}",
                describe_day(day),
                self.type_id,
                describe_day(self.min),
                describe_day(self.max),
            )));
        }
        Ok(day)
    }
}

// ---------------------------------------------------------------------------
// Day numbers and ticks
// ---------------------------------------------------------------------------

/// Days since 0001-01-01.
fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - 1
}

fn date_from_day_number(day: i64) -> Result<NaiveDate> {
    i32::try_from(day + 1)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| Error::InvalidTemporalValue(format!("day number {day} is not a valid date")))
}

fn describe_day(day: i64) -> String {
    date_from_day_number(day)
        .map(|d| d.to_string())
        .unwrap_or_else(|_| format!("day {day}"))
}

/// Nanoseconds since midnight. A leap second is folded into the second before.
fn nanos_of_day(time: NaiveTime) -> u64 {
    u64::from(time.num_seconds_from_midnight()) * NANOS_PER_SECOND
        + u64::from(time.nanosecond().min(999_999_999))
}

fn time_from_nanos(nanos: u64) -> Result<NaiveTime> {
    let secs = u32::try_from(nanos / NANOS_PER_SECOND).ok();
    // The remainder is below 10^9.
    let frac = (nanos % NANOS_PER_SECOND) as u32;
    secs.and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, frac))
        .ok_or_else(|| Error::InvalidTemporalValue(format!("{nanos} ns is not a time of day")))
}

fn unit_nanos(scale: u8) -> u64 {
    10u64.pow(9 - u32::from(scale))
}

fn ticks_per_day(scale: u8) -> u64 {
    NANOS_PER_DAY / unit_nanos(scale)
}

/// Byte width of `time(scale)`.
fn time_len(scale: u8) -> usize {
    match scale {
        0..=2 => 3,
        3..=4 => 4,
        _ => 5,
    }
}

pub(crate) fn check_time_scale(scale: u8) -> Result<()> {
    if scale > MAX_TIME_SCALE {
        return Err(Error::InvalidPrecisionOrScale(format!(
            "fractional second scale {scale} is outside 0..={MAX_TIME_SCALE}"
        )));
    }
    Ok(())
}

/// Round `(day, nanos)` to `unit` and resolve a carry into the next day.
fn round_to_unit(day: i64, nanos: u64, unit: u64, per_day: u64, max_day: i64) -> (i64, u64) {
    let rounded = (nanos + unit / 2) / unit;
    if rounded < per_day {
        (day, rounded)
    } else if day < max_day {
        (day + 1, 0)
    } else {
        (day, nanos / unit)
    }
}

fn write_uint(out: &mut Vec<u8>, value: u64, len: usize) {
    out.extend_from_slice(&value.to_le_bytes()[..len]);
}

fn read_uint(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}

fn write_time_ticks(out: &mut Vec<u8>, scale: u8, ticks: u64) {
    write_uint(out, ticks, time_len(scale));
}

fn read_time(type_id: &str, scale: u8, bytes: &[u8]) -> Result<NaiveTime> {
    let ticks = read_uint(bytes);
    if ticks >= ticks_per_day(scale) {
        return Err(Error::InvalidTemporalValue(format!(
            "{type_id} tick count {ticks} exceeds one day"
        )));
    }
    time_from_nanos(ticks * unit_nanos(scale))
}

fn write_date(out: &mut Vec<u8>, day: i64) {
    // Range-checked by the caller: 0..=3_652_058 fits 3 bytes.
    write_uint(out, day as u64, DATE_LEN);
}

fn read_date(bytes: &[u8]) -> Result<NaiveDate> {
    // Three bytes can exceed 9999-12-31.
    let day = DATE_RANGE.check(read_uint(bytes) as i64)?;
    date_from_day_number(day)
}

fn check_len(type_id: &str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() != expected {
        return Err(Error::InvalidLength(format!(
            "{type_id} needs {expected} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// date / time / datetime2
// ---------------------------------------------------------------------------

pub(crate) fn serialize_date(value: &Value) -> Result<Vec<u8>> {
    let Value::Date(date) = value else {
        return Err(mismatch("date", value));
    };
    let day = DATE_RANGE.check(day_number(*date))?;
    let mut out = Vec::with_capacity(DATE_LEN);
    write_date(&mut out, day);
    Ok(out)
}

pub(crate) fn deserialize_date(bytes: &[u8]) -> Result<Value> {
    check_len("date", bytes, DATE_LEN)?;
    Ok(Value::Date(read_date(bytes)?))
}

/// A bare time has no day to carry into, so a round-up to midnight truncates.
pub(crate) fn serialize_time(scale: u8, value: &Value) -> Result<Vec<u8>> {
    let Value::Time(time) = value else {
        return Err(mismatch("time", value));
    };
    let (_, ticks) = round_to_unit(0, nanos_of_day(*time), unit_nanos(scale), ticks_per_day(scale), 0);
    let mut out = Vec::with_capacity(time_len(scale));
    write_time_ticks(&mut out, scale, ticks);
    Ok(out)
}

pub(crate) fn deserialize_time(scale: u8, bytes: &[u8]) -> Result<Value> {
    check_len("time", bytes, time_len(scale))?;
    Ok(Value::Time(read_time("time", scale, bytes)?))
}

/// Round a date-time onto `time(scale)` ticks within the date range.
fn split_datetime(dt: NaiveDateTime, scale: u8) -> Result<(i64, u64)> {
    let day = DATE_RANGE.check(day_number(dt.date()))?;
    Ok(round_to_unit(
        day,
        nanos_of_day(dt.time()),
        unit_nanos(scale),
        ticks_per_day(scale),
        DATE_RANGE.max,
    ))
}

pub(crate) fn serialize_datetime2(scale: u8, value: &Value) -> Result<Vec<u8>> {
    let Value::DateTime(dt) = value else {
        return Err(mismatch("datetime2", value));
    };
    let (day, ticks) = split_datetime(*dt, scale)?;
    let mut out = Vec::with_capacity(time_len(scale) + DATE_LEN);
    write_time_ticks(&mut out, scale, ticks);
    write_date(&mut out, day);
    Ok(out)
}

pub(crate) fn deserialize_datetime2(scale: u8, bytes: &[u8]) -> Result<Value> {
    let tl = time_len(scale);
    check_len("datetime2", bytes, tl + DATE_LEN)?;
    let time = read_time("datetime2", scale, &bytes[..tl])?;
    let date = read_date(&bytes[tl..])?;
    Ok(Value::DateTime(NaiveDateTime::new(date, time)))
}

// ---------------------------------------------------------------------------
// datetimeoffset
// ---------------------------------------------------------------------------

pub(crate) fn serialize_datetimeoffset(scale: u8, value: &Value) -> Result<Vec<u8>> {
    let Value::DateTimeOffset(dto) = value else {
        return Err(mismatch("datetimeoffset", value));
    };
    let offset_secs = dto.offset().local_minus_utc();
    if offset_secs % 60 != 0 {
        return Err(Error::InvalidTemporalValue(format!(
            "offset {} has a seconds component",
            dto.offset()
        )));
    }
    let offset_minutes = offset_secs / 60;
    if offset_minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(Error::InvalidTemporalValue(format!(
            "offset {} is beyond ±14:00",
            dto.offset()
        )));
    }
    DATE_RANGE.check(day_number(dto.naive_local().date()))?;
    let (day, ticks) = split_datetime(dto.naive_utc(), scale)?;

    let mut out = Vec::with_capacity(time_len(scale) + DATE_LEN + 2);
    write_time_ticks(&mut out, scale, ticks);
    write_date(&mut out, day);
    // Bounded by ±840 above.
    out.extend_from_slice(&(offset_minutes as i16).to_le_bytes());
    Ok(out)
}

pub(crate) fn deserialize_datetimeoffset(scale: u8, bytes: &[u8]) -> Result<Value> {
    let tl = time_len(scale);
    check_len("datetimeoffset", bytes, tl + DATE_LEN + 2)?;
    let time = read_time("datetimeoffset", scale, &bytes[..tl])?;
    let date = read_date(&bytes[tl..tl + DATE_LEN])?;
    let minutes = i16::from_le_bytes([bytes[tl + DATE_LEN], bytes[tl + DATE_LEN + 1]]);
    if i32::from(minutes).abs() > MAX_OFFSET_MINUTES {
        return Err(Error::InvalidTemporalValue(format!(
            "encoded offset of {minutes} minutes is beyond ±14:00"
        )));
    }
    let offset = FixedOffset::east_opt(i32::from(minutes) * 60).ok_or_else(|| {
        Error::InvalidTemporalValue(format!("invalid offset of {minutes} minutes"))
    })?;
    let utc = NaiveDateTime::new(date, time);
    Ok(Value::DateTimeOffset(DateTime::from_naive_utc_and_offset(
        utc, offset,
    )))
}

// ---------------------------------------------------------------------------
// datetime / smalldatetime
// ---------------------------------------------------------------------------

pub(crate) fn serialize_datetime(value: &Value) -> Result<Vec<u8>> {
    let Value::DateTime(dt) = value else {
        return Err(mismatch("datetime", value));
    };
    let mut day = DATETIME_RANGE.check(day_number(dt.date()))?;
    let millis = nanos_of_day(dt.time()) / NANOS_PER_MILLI;

    // 1/300 s ticks, rounded half up from milliseconds.
    let mut ticks = (millis * 3 + 5) / 10;
    if ticks >= DATETIME_TICKS_PER_DAY {
        if day < DATETIME_RANGE.max {
            day += 1;
            ticks = 0;
        } else {
            ticks = millis * 3 / 10;
        }
    }

    let mut out = Vec::with_capacity(8);
    // Range-checked, so the offset from 1900 fits an i32.
    out.extend_from_slice(&((day - DAY_1900) as i32).to_le_bytes());
    out.extend_from_slice(&(ticks as u32).to_le_bytes());
    Ok(out)
}

pub(crate) fn deserialize_datetime(bytes: &[u8]) -> Result<Value> {
    let raw: [u8; 8] = expect_len("datetime", bytes)?;
    let days = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let ticks = u64::from(u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]));
    let day = DATETIME_RANGE.check(i64::from(days) + DAY_1900)?;
    if ticks >= DATETIME_TICKS_PER_DAY {
        return Err(Error::InvalidTemporalValue(format!(
            "datetime tick count {ticks} exceeds one day"
        )));
    }
    // Nearest millisecond: ticks * 10/3, rounded half up.
    let millis = (ticks * 20 + 3) / 6;
    let time = time_from_nanos(millis * NANOS_PER_MILLI)?;
    Ok(Value::DateTime(NaiveDateTime::new(date_from_day_number(day)?, time)))
}

/// Seconds from 29.999 upward round to the next minute.
pub(crate) fn serialize_smalldatetime(value: &Value) -> Result<Vec<u8>> {
    let Value::DateTime(dt) = value else {
        return Err(mismatch("smalldatetime", value));
    };
    let mut day = SMALLDATETIME_RANGE.check(day_number(dt.date()))?;
    let millis = nanos_of_day(dt.time()) / NANOS_PER_MILLI;

    let mut minutes = (millis + MILLIS_PER_MINUTE / 2 + 1) / MILLIS_PER_MINUTE;
    if minutes >= MINUTES_PER_DAY {
        if day < SMALLDATETIME_RANGE.max {
            day += 1;
            minutes = 0;
        } else {
            minutes = millis / MILLIS_PER_MINUTE;
        }
    }

    let mut out = Vec::with_capacity(4);
    // Both values are bounded by the range check and the carry above.
    out.extend_from_slice(&((day - DAY_1900) as u16).to_le_bytes());
    out.extend_from_slice(&(minutes as u16).to_le_bytes());
    Ok(out)
}

pub(crate) fn deserialize_smalldatetime(bytes: &[u8]) -> Result<Value> {
    let raw: [u8; 4] = expect_len("smalldatetime", bytes)?;
    let days = u16::from_le_bytes([raw[0], raw[1]]);
    let minutes = u64::from(u16::from_le_bytes([raw[2], raw[3]]));
    if minutes >= MINUTES_PER_DAY {
        return Err(Error::InvalidTemporalValue(format!(
            "smalldatetime minute count {minutes} exceeds one day"
        )));
    }
    let date = date_from_day_number(i64::from(days) + DAY_1900)?;
    let time = time_from_nanos(minutes * MILLIS_PER_MINUTE * NANOS_PER_MILLI)?;
    Ok(Value::DateTime(NaiveDateTime::new(date, time)))
}
