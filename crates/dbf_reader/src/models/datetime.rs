//! Calendar conversions for dBase date and datetime fields
//!
//! `D` fields store `YYYYMMDD` as ASCII text. Visual FoxPro `T` fields store
//! a Julian day number followed by milliseconds since midnight, both as
//! little-endian `i32`. All results are UTC with no offset applied.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike, Utc};

pub const MILLISECONDS_PER_SECOND: i64 = 1_000;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Convert a Julian day number and milliseconds since midnight into a UTC
/// timestamp.
///
/// Sub-second milliseconds are discarded, so `86_399_999` ms is `23:59:59`
/// of the same day. Negative inputs are handled with floor division.
/// Returns `None` when the date falls outside chrono's representable range.
pub fn julian_to_datetime(julian_day: i32, ms_since_midnight: i32) -> Option<DateTime<Utc>> {
    let s1 = i64::from(julian_day) + 68_569;
    let n = (4 * s1).div_euclid(146_097);
    let s2 = s1 - (146_097 * n + 3).div_euclid(4);
    let i = (4_000 * (s2 + 1)).div_euclid(1_461_001);
    let s3 = s2 - (1_461 * i).div_euclid(4) + 31;
    let q = (80 * s3).div_euclid(2_447);
    let f = q.div_euclid(11);

    let year = 100 * (n - 49) + i + f;
    let month = q + 2 - 12 * f;
    let day = s3 - (2_447 * q).div_euclid(80);

    let date = NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )?;

    let total_seconds = i64::from(ms_since_midnight).div_euclid(MILLISECONDS_PER_SECOND);
    let hour = total_seconds.div_euclid(3_600);
    let minute = total_seconds.div_euclid(60).rem_euclid(60);
    let second = total_seconds.rem_euclid(60);

    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    midnight.checked_add_signed(TimeDelta::try_seconds(hour * 3_600 + minute * 60 + second)?)
}

/// Julian day number of a proleptic Gregorian calendar date
pub fn julian_day_number(date: NaiveDate) -> i64 {
    let month = i64::from(date.month());
    let a = (14 - month).div_euclid(12);
    let y = i64::from(date.year()) + 4_800 - a;
    let m = month + 12 * a - 3;

    i64::from(date.day()) + (153 * m + 2).div_euclid(5) + 365 * y + y.div_euclid(4)
        - y.div_euclid(100)
        + y.div_euclid(400)
        - 32_045
}

/// Split a timestamp into the `(julian_day, ms_since_midnight)` pair stored in `T` fields
pub fn datetime_to_julian(timestamp: DateTime<Utc>) -> (i64, i64) {
    let julian = julian_day_number(timestamp.date_naive());
    let ms = i64::from(timestamp.num_seconds_from_midnight()) * MILLISECONDS_PER_SECOND
        + i64::from(timestamp.timestamp_subsec_millis());
    (julian, ms)
}

/// Parse a `YYYYMMDD` date field into UTC midnight.
///
/// Blank, all-zero, wrong-length, non-digit and impossible dates yield `None`.
pub fn parse_dbase_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.len() != 8 || text == "00000000" || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = text[0..4].parse().ok()?;
    let month: u32 = text[4..6].parse().ok()?;
    let day: u32 = text[6..8].parse().ok()?;

    Some(NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?.and_utc())
}
