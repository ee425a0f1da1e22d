//! DATE, TIME and TIMESTAMP codec.
//!
//! The engine counts dates in days since 1858-11-17 (signed 32-bit) and
//! times of day in ticks of 100 microseconds (unsigned 32-bit). A timestamp
//! is a date followed by a time.
//!
//! Text follows the engine's own rendering: `YYYY-MM-DD`, `HH:MM:SS.ffff`
//! (always four fractional digits) and the two joined by a space.

use crate::error::{Error, Result};
use crate::protocol::constants::{TIME_TICKS_PER_DAY, TIME_TICKS_PER_SECOND};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const NANOS_PER_TICK: u32 = 100_000;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1858, 11, 17).unwrap_or(NaiveDate::MIN)
}

fn check_year(date: NaiveDate) -> Result<()> {
    if !(1..=9999).contains(&date.year()) {
        return Err(Error::conversion(
            "date",
            "DATE",
            format!("{} is outside 0001-01-01..9999-12-31", date),
        ));
    }
    Ok(())
}

/// Encode a calendar date as days since the engine epoch.
///
/// # Errors
/// Returns `Error::Conversion` for years outside 1..=9999.
pub fn encode_date(date: NaiveDate) -> Result<i32> {
    check_year(date)?;
    Ok((date - epoch()).num_days() as i32)
}

/// Decode days since the engine epoch.
pub fn decode_date(days: i32) -> Result<NaiveDate> {
    let date = epoch()
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| Error::conversion("DATE", "date", format!("day number {} out of range", days)))?;
    check_year(date)?;
    Ok(date)
}

/// Encode a time of day as ticks. Sub-tick precision is truncated.
pub fn encode_time(time: NaiveTime) -> u32 {
    // leap second representation folds into the last tick of the second
    let nanos = time.nanosecond().min(999_999_999);
    time.num_seconds_from_midnight() * TIME_TICKS_PER_SECOND + nanos / NANOS_PER_TICK
}

/// Decode ticks into a time of day.
///
/// # Errors
/// Returns `Error::Conversion` when `ticks` is a day or more.
pub fn decode_time(ticks: u32) -> Result<NaiveTime> {
    if ticks >= TIME_TICKS_PER_DAY {
        return Err(Error::conversion(
            "TIME",
            "time",
            format!("{} ticks exceed one day", ticks),
        ));
    }
    let seconds = ticks / TIME_TICKS_PER_SECOND;
    let nanos = (ticks % TIME_TICKS_PER_SECOND) * NANOS_PER_TICK;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
        .ok_or_else(|| Error::conversion("TIME", "time", format!("invalid tick count {}", ticks)))
}

pub fn encode_timestamp(timestamp: NaiveDateTime) -> Result<(i32, u32)> {
    Ok((encode_date(timestamp.date())?, encode_time(timestamp.time())))
}

pub fn decode_timestamp(date: i32, time: u32) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::new(decode_date(date)?, decode_time(time)?))
}

pub fn format_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

pub fn format_time(time: NaiveTime) -> String {
    let ticks = encode_time(time) % TIME_TICKS_PER_SECOND;
    format!(
        "{:02}:{:02}:{:02}.{:04}",
        time.hour(),
        time.minute(),
        time.second(),
        ticks
    )
}

pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    format!(
        "{} {}",
        format_date(timestamp.date()),
        format_time(timestamp.time())
    )
}

fn malformed(text: &str, target: &str) -> Error {
    Error::conversion("string", target, format!("'{}' is not a valid {}", text, target))
}

fn parse_number(part: &str, text: &str, target: &str) -> Result<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(text, target));
    }
    part.parse::<u32>().map_err(|_| malformed(text, target))
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    let mut parts = text.splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed(text, "date"));
    };
    let year = parse_number(year, text, "date")?;
    let month = parse_number(month, text, "date")?;
    let day = parse_number(day, text, "date")?;

    let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| malformed(text, "date"))?;
    check_year(date)?;
    Ok(date)
}

/// Parse `HH:MM[:SS[.ffff]]`. Fractions beyond four digits are truncated.
pub fn parse_time(text: &str) -> Result<NaiveTime> {
    let text = text.trim();
    let (clock, fraction) = match text.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (text, None),
    };

    let mut parts = clock.split(':');
    let hour = parse_number(parts.next().unwrap_or_default(), text, "time")?;
    let minute = parse_number(parts.next().unwrap_or_default(), text, "time")?;
    let second = match parts.next() {
        Some(part) => parse_number(part, text, "time")?,
        None if fraction.is_none() => 0,
        None => return Err(malformed(text, "time")),
    };
    if parts.next().is_some() {
        return Err(malformed(text, "time"));
    }

    let ticks = match fraction {
        Some(fraction) => {
            parse_number(fraction, text, "time")?;
            let digits: String = fraction.chars().chain("0000".chars()).take(4).collect();
            parse_number(&digits, text, "time")?
        }
        None => 0,
    };

    NaiveTime::from_hms_nano_opt(hour, minute, second, ticks * NANOS_PER_TICK)
        .ok_or_else(|| malformed(text, "time"))
}

/// Parse `YYYY-MM-DD[ HH:MM[:SS[.ffff]]]`; a `T` separator is accepted too.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    let (date, time) = match text.split_once([' ', 'T']) {
        Some((date, time)) => (parse_date(date)?, parse_time(time)?),
        None => (parse_date(text)?, NaiveTime::MIN),
    };
    Ok(NaiveDateTime::new(date, time))
}
