//! Time zone identifiers and zoned time conversion.
//!
//! Zoned values travel as a UTC instant plus a 16-bit zone id. Offset zones
//! use `sign * (hours * 60 + minutes) + 1439`; named regions count down
//! from 65535. Region rules belong to the engine, so the mapping goes through
//! the [`TimeZoneRules`] trait; [`FixedOffsetZones`] covers GMT, UTC and
//! numeric offsets without any engine help.

use super::date::{format_time, format_timestamp, parse_time, parse_timestamp};
use crate::error::{Error, Result};
use crate::protocol::constants::{
    ISC_INVALID_TIMEZONE_REGION, TIME_ZONE_GMT, TIME_ZONE_OFFSET_BIAS, TIME_ZONE_UTC,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Zone rules supplied by the engine.
pub trait TimeZoneRules: Send + Sync {
    /// Zone id for a zone name or `±HH:MM` offset.
    fn zone_id(&self, name: &str) -> Result<u16>;

    /// Display name of a zone id.
    fn zone_name(&self, id: u16) -> Result<String>;

    /// Offset from UTC in minutes at the given UTC instant.
    fn offset_at_utc(&self, id: u16, utc: NaiveDateTime) -> Result<i32>;

    /// Offset from UTC in minutes for the given local wall-clock time.
    fn offset_at_local(&self, id: u16, local: NaiveDateTime) -> Result<i32>;
}

/// Offset in minutes encoded by an offset zone id, or `None` for region ids.
pub fn offset_of_id(id: u16) -> Option<i32> {
    let minutes = id as i32 - TIME_ZONE_OFFSET_BIAS;
    (minutes.abs() <= TIME_ZONE_OFFSET_BIAS).then_some(minutes)
}

/// Zone id of an offset in minutes.
pub fn id_of_offset(minutes: i32) -> Option<u16> {
    (minutes.abs() <= TIME_ZONE_OFFSET_BIAS).then(|| (minutes + TIME_ZONE_OFFSET_BIAS) as u16)
}

/// Parse `+HH:MM`, `-HH:MM`, `+HH` or `-HHMM`.
pub fn parse_offset(text: &str) -> Option<i32> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() > 2 => rest.split_at(2),
        None => (rest, "0"),
    };
    if hours.is_empty() || !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

pub fn format_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.abs();
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

fn invalid_zone(name: &str) -> Error {
    Error::engine(
        vec![ISC_INVALID_TIMEZONE_REGION],
        format!("Invalid time zone region: {}", name),
    )
}

/// GMT, UTC and numeric offsets.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedOffsetZones;

impl TimeZoneRules for FixedOffsetZones {
    fn zone_id(&self, name: &str) -> Result<u16> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("GMT") {
            return Ok(TIME_ZONE_GMT);
        }
        if name.eq_ignore_ascii_case("UTC") {
            return Ok(TIME_ZONE_UTC);
        }
        parse_offset(name)
            .and_then(id_of_offset)
            .ok_or_else(|| invalid_zone(name))
    }

    fn zone_name(&self, id: u16) -> Result<String> {
        match id {
            TIME_ZONE_GMT => Ok("GMT".to_string()),
            TIME_ZONE_UTC => Ok("UTC".to_string()),
            _ => offset_of_id(id)
                .map(format_offset)
                .ok_or_else(|| invalid_zone(&id.to_string())),
        }
    }

    fn offset_at_utc(&self, id: u16, _utc: NaiveDateTime) -> Result<i32> {
        self.offset_at_local(id, NaiveDateTime::MIN)
    }

    fn offset_at_local(&self, id: u16, _local: NaiveDateTime) -> Result<i32> {
        match id {
            TIME_ZONE_GMT | TIME_ZONE_UTC => Ok(0),
            _ => offset_of_id(id).ok_or_else(|| invalid_zone(&id.to_string())),
        }
    }
}

/// Reference date used to resolve region offsets for TIME WITH TIME ZONE.
fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn wrap_time(time: NaiveTime, minutes: i32) -> NaiveTime {
    let (shifted, _) = time.overflowing_add_signed(Duration::minutes(minutes as i64));
    shifted
}

/// Split `<time text> <zone>` at the last space.
fn split_zone(text: &str, target: &str) -> Result<(String, String)> {
    let text = text.trim();
    text.rsplit_once(' ')
        .map(|(value, zone)| (value.to_string(), zone.to_string()))
        .ok_or_else(|| {
            Error::conversion(
                "string",
                target,
                format!("'{}' has no time zone", text),
            )
        })
}

/// Parse `HH:MM:SS.ffff ZONE` into a UTC time and a zone id.
pub fn parse_time_tz(text: &str, rules: &dyn TimeZoneRules) -> Result<(NaiveTime, u16)> {
    let (time, zone) = split_zone(text, "time with time zone")?;
    let local = parse_time(&time)?;
    let id = rules.zone_id(&zone)?;
    let offset = rules.offset_at_local(id, NaiveDateTime::new(reference_date(), local))?;
    Ok((wrap_time(local, -offset), id))
}

/// Render a UTC time with its zone as local time plus zone name.
pub fn format_time_tz(utc: NaiveTime, id: u16, rules: &dyn TimeZoneRules) -> Result<String> {
    let offset = rules.offset_at_utc(id, NaiveDateTime::new(reference_date(), utc))?;
    Ok(format!(
        "{} {}",
        format_time(wrap_time(utc, offset)),
        rules.zone_name(id)?
    ))
}

/// Parse `YYYY-MM-DD HH:MM:SS.ffff ZONE` into a UTC timestamp and a zone id.
pub fn parse_timestamp_tz(text: &str, rules: &dyn TimeZoneRules) -> Result<(NaiveDateTime, u16)> {
    let (timestamp, zone) = split_zone(text, "timestamp with time zone")?;
    let local = parse_timestamp(&timestamp)?;
    let id = rules.zone_id(&zone)?;
    let offset = rules.offset_at_local(id, local)?;
    let utc = local
        .checked_sub_signed(Duration::minutes(offset as i64))
        .ok_or_else(|| Error::conversion("string", "timestamp with time zone", "out of range"))?;
    Ok((utc, id))
}

/// Render a UTC timestamp with its zone as local timestamp plus zone name.
pub fn format_timestamp_tz(utc: NaiveDateTime, id: u16, rules: &dyn TimeZoneRules) -> Result<String> {
    let offset = rules.offset_at_utc(id, utc)?;
    let local = utc
        .checked_add_signed(Duration::minutes(offset as i64))
        .ok_or_else(|| Error::conversion("timestamp with time zone", "string", "out of range"))?;
    Ok(format!("{} {}", format_timestamp(local), rules.zone_name(id)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_ids() {
        assert_eq!(id_of_offset(0), Some(1439));
        assert_eq!(id_of_offset(180), Some(1619));
        assert_eq!(id_of_offset(-330), Some(1109));
        assert_eq!(offset_of_id(1619), Some(180));
        assert_eq!(offset_of_id(TIME_ZONE_GMT), None);
        assert_eq!(id_of_offset(1440), None);
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+03:00"), Some(180));
        assert_eq!(parse_offset("-05:30"), Some(-330));
        assert_eq!(parse_offset("+02"), Some(120));
        assert_eq!(parse_offset("-0130"), Some(-90));
        assert_eq!(parse_offset("03:00"), None);
        assert_eq!(parse_offset("+24:00"), None);
        assert_eq!(format_offset(-330), "-05:30");
    }

    #[test]
    fn test_fixed_zones() {
        let zones = FixedOffsetZones;
        assert_eq!(zones.zone_id("UTC").unwrap(), TIME_ZONE_UTC);
        assert_eq!(zones.zone_id("gmt").unwrap(), TIME_ZONE_GMT);
        assert_eq!(zones.zone_name(zones.zone_id("+03:00").unwrap()).unwrap(), "+03:00");
        assert!(zones.zone_id("Mars/Olympus").is_err());
    }

    #[test]
    fn test_time_tz_text() {
        let zones = FixedOffsetZones;
        let (utc, id) = parse_time_tz("10:20:30.5000 UTC", &zones).unwrap();
        assert_eq!(format_time_tz(utc, id, &zones).unwrap(), "10:20:30.5000 UTC");

        let (utc, id) = parse_time_tz("01:00:00.0000 +03:00", &zones).unwrap();
        assert_eq!(utc, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(format_time_tz(utc, id, &zones).unwrap(), "01:00:00.0000 +03:00");
        assert!(parse_time_tz("10:20:30", &zones).is_err());
    }

    #[test]
    fn test_timestamp_tz_text() {
        let zones = FixedOffsetZones;
        let (utc, id) = parse_timestamp_tz("2024-07-15 16:45:30.1234 UTC", &zones).unwrap();
        assert_eq!(
            format_timestamp_tz(utc, id, &zones).unwrap(),
            "2024-07-15 16:45:30.1234 UTC"
        );

        let (utc, _) = parse_timestamp_tz("2024-01-01 01:00:00 +02:00", &zones).unwrap();
        assert_eq!(utc, parse_timestamp("2023-12-31 23:00:00").unwrap());
    }
}
