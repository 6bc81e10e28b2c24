//! FILETIME calendar decomposition and recomposition
//!
//! Mirrors the RtlTimeToTimeFields/RtlTimeFieldsToTime pair guest code
//! calls: a FILETIME splits into broken-down civil time at millisecond
//! precision, and invalid civil dates recompose to zero.

use crate::clock::UNIX_EPOCH_FILETIME;

const TICKS_PER_MILLI: i64 = 10_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_DAY: i64 = 86_400 * TICKS_PER_SECOND;

/// Broken-down civil time. Weekday encoding is 0=Sunday..6=Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub millisecond: u32,
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

// Days from 1970-01-01 to year/month/day in the proleptic Gregorian
// calendar (Howard Hinnant's days_from_civil).
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = (if month <= 2 { year - 1 } else { year }) as i64;
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 } as i64;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

// Inverse of days_from_civil.
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = (y + if month <= 2 { 1 } else { 0 }) as i32;
    (year, month, day)
}

/// Decompose a FILETIME into civil time fields.
pub fn decompose(filetime: u64) -> TimeFields {
    let unix_ticks = filetime as i64 - UNIX_EPOCH_FILETIME as i64;
    let days = unix_ticks.div_euclid(TICKS_PER_DAY);
    let tod_ticks = unix_ticks.rem_euclid(TICKS_PER_DAY);

    let (year, month, day) = civil_from_days(days);
    // 1970-01-01 is a Thursday (4).
    let weekday = (days + 4).rem_euclid(7) as u32;

    let millis = tod_ticks / TICKS_PER_MILLI;
    let second = (millis / 1000) as u32;
    TimeFields {
        year,
        month,
        day,
        weekday,
        hour: second / 3600,
        minute: second / 60 % 60,
        second: second % 60,
        millisecond: (millis % 1000) as u32,
    }
}

/// Recompose civil time fields into a FILETIME; zero for any invalid date
/// or time-of-day component.
pub fn recompose(fields: &TimeFields) -> u64 {
    if fields.month < 1
        || fields.month > 12
        || fields.day < 1
        || fields.day > days_in_month(fields.year, fields.month)
        || fields.hour > 23
        || fields.minute > 59
        || fields.second > 59
        || fields.millisecond > 999
    {
        return 0;
    }

    let days = days_from_civil(fields.year, fields.month, fields.day);
    let tod_seconds =
        fields.hour as i64 * 3600 + fields.minute as i64 * 60 + fields.second as i64;
    let ticks = days * TICKS_PER_DAY
        + tod_seconds * TICKS_PER_SECOND
        + fields.millisecond as i64 * TICKS_PER_MILLI
        + UNIX_EPOCH_FILETIME as i64;
    if ticks < 0 {
        0
    } else {
        ticks as u64
    }
}

/// Weekday of a civil date, 0=Sunday..6=Saturday.
pub fn weekday(year: i32, month: u32, day: u32) -> u32 {
    (days_from_civil(year, month, day) + 4).rem_euclid(7) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const FT_NT_EPOCH: u64 = 0; // 1601-01-01
    const FT_UNIX_EPOCH: u64 = 116_444_736_000_000_000; // 1970-01-01
    const FT_Y2K: u64 = 125_911_584_000_000_000; // 2000-01-01
    const FT_LEAP_DAY: u64 = 125_962_560_000_000_000; // 2000-02-29
    const FT_SUB_DAY: u64 = 132_538_032_123_450_000; // 2020-12-30 12:00:12.345
    const FT_2021: u64 = 132_539_328_000_000_000; // 2021-01-01

    #[test]
    fn test_decompose_nt_epoch() {
        let tf = decompose(FT_NT_EPOCH);
        assert_eq!((tf.year, tf.month, tf.day), (1601, 1, 1));
        assert_eq!(tf.weekday, 1); // Monday
        assert_eq!((tf.hour, tf.minute, tf.second, tf.millisecond), (0, 0, 0, 0));
    }

    #[test]
    fn test_decompose_unix_epoch() {
        let tf = decompose(FT_UNIX_EPOCH);
        assert_eq!((tf.year, tf.month, tf.day), (1970, 1, 1));
        assert_eq!(tf.weekday, 4); // Thursday
    }

    #[test]
    fn test_decompose_y2k() {
        let tf = decompose(FT_Y2K);
        assert_eq!((tf.year, tf.month, tf.day), (2000, 1, 1));
        assert_eq!(tf.weekday, 6); // Saturday
    }

    #[test]
    fn test_decompose_leap_day() {
        let tf = decompose(FT_LEAP_DAY);
        assert_eq!((tf.year, tf.month, tf.day), (2000, 2, 29));
        assert_eq!(tf.weekday, 2); // Tuesday
    }

    #[test]
    fn test_decompose_sub_day() {
        let tf = decompose(FT_SUB_DAY);
        assert_eq!((tf.year, tf.month, tf.day), (2020, 12, 30));
        assert_eq!(tf.weekday, 3); // Wednesday
        assert_eq!((tf.hour, tf.minute, tf.second), (12, 0, 12));
        assert_eq!(tf.millisecond, 345);
    }

    #[test]
    fn test_recompose_known_dates() {
        let fields = |y, mo, d, h, mi, s, ms| TimeFields {
            year: y,
            month: mo,
            day: d,
            weekday: 0, // ignored by recompose
            hour: h,
            minute: mi,
            second: s,
            millisecond: ms,
        };
        assert_eq!(recompose(&fields(1601, 1, 1, 0, 0, 0, 0)), FT_NT_EPOCH);
        assert_eq!(recompose(&fields(1970, 1, 1, 0, 0, 0, 0)), FT_UNIX_EPOCH);
        assert_eq!(recompose(&fields(2000, 1, 1, 0, 0, 0, 0)), FT_Y2K);
        assert_eq!(recompose(&fields(2000, 2, 29, 0, 0, 0, 0)), FT_LEAP_DAY);
        assert_eq!(recompose(&fields(2020, 12, 30, 12, 0, 12, 345)), FT_SUB_DAY);
        assert_eq!(recompose(&fields(2021, 1, 1, 0, 0, 0, 0)), FT_2021);
    }

    #[test]
    fn test_round_trip() {
        for ft in [
            FT_NT_EPOCH,
            FT_UNIX_EPOCH,
            FT_Y2K,
            FT_LEAP_DAY,
            FT_SUB_DAY,
            FT_2021,
        ] {
            let tf = decompose(ft);
            assert_eq!(recompose(&tf), ft, "round trip failed for {ft}");
        }
    }

    #[test]
    fn test_recompose_rejects_invalid_dates() {
        let base = TimeFields {
            year: 2000,
            month: 2,
            day: 30,
            weekday: 0,
            hour: 0,
            minute: 0,
            second: 0,
            millisecond: 0,
        };
        // Feb 30 never exists.
        assert_eq!(recompose(&base), 0);
        // Feb 29 outside leap years.
        assert_eq!(recompose(&TimeFields { year: 2001, day: 29, ..base }), 0);
        // Century rule: 1900 is not a leap year, 2000 is.
        assert_eq!(recompose(&TimeFields { year: 1900, day: 29, ..base }), 0);
        assert_ne!(recompose(&TimeFields { year: 2000, day: 29, ..base }), 0);
        // Month 13, day 0.
        assert_eq!(recompose(&TimeFields { month: 13, day: 1, ..base }), 0);
        assert_eq!(recompose(&TimeFields { month: 1, day: 0, ..base }), 0);
        // Out-of-range time of day.
        assert_eq!(recompose(&TimeFields { day: 1, hour: 24, ..base }), 0);
    }

    #[test]
    fn test_weekday_encoding() {
        assert_eq!(weekday(2000, 1, 2), 0); // Sunday
        assert_eq!(weekday(1601, 1, 1), 1); // Monday
        assert_eq!(weekday(2000, 2, 29), 2); // Tuesday
        assert_eq!(weekday(2020, 12, 30), 3); // Wednesday
        assert_eq!(weekday(1970, 1, 1), 4); // Thursday
        assert_eq!(weekday(2021, 1, 1), 5); // Friday
        assert_eq!(weekday(2000, 1, 1), 6); // Saturday
    }
}
