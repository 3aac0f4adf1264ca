//! ISO 8601 / RFC 3339 text forms for temporal values.
//!
//! Converts between text and the DON internal representations:
//! - Date: days since Unix epoch (1970-01-01), `YYYY-MM-DD`
//! - Time: microseconds since midnight, `HH:MM:SS[.ffffff]`
//! - Datetime: microseconds since Unix epoch, UTC, `YYYY-MM-DDTHH:MM:SS[.ffffff]Z`
//! - Duration: signed microseconds, `[-]P[nD][T[nH][nM][n[.f]S]]`
//!
//! Parsing accepts any number of fractional digits and truncates to
//! microseconds. Datetime offsets are folded into UTC.

use std::ops::Range;

use thiserror::Error;

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
pub const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
pub const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

/// Longest accepted year field. Keeps day arithmetic far from i64 overflow.
const MAX_YEAR_DIGITS: usize = 9;

/// Error type for temporal text parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DateTimeParseError {
    pub message: String,
}

fn invalid(what: &str, text: &str) -> DateTimeParseError {
    DateTimeParseError {
        message: format!("Invalid {}: {:?}", what, text),
    }
}

/// Parses exactly `len` ASCII digits.
fn parse_digits(s: &str, len: usize, what: &str, text: &str) -> Result<i64, DateTimeParseError> {
    if s.len() != len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(what, text));
    }
    s.parse().map_err(|_| invalid(what, text))
}

/// Parses the digits at byte `range` of `s`. A range that splits a character
/// is rejected like any other non-digit.
fn digits_at(s: &str, range: Range<usize>, what: &str, text: &str) -> Result<i64, DateTimeParseError> {
    let len = range.len();
    parse_digits(s.get(range).unwrap_or_default(), len, what, text)
}

/// Parses a timezone offset string (Z, +HH:MM, -HH:MM) and returns offset in minutes.
fn parse_timezone_offset(offset: &str, text: &str) -> Result<i64, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }
    if offset.len() != 6 || offset.as_bytes()[3] != b':' {
        return Err(invalid("timezone offset", text));
    }
    let sign = match offset.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(invalid("timezone offset", text)),
    };
    let hours = digits_at(offset, 1..3, "timezone offset", text)?;
    let minutes = digits_at(offset, 4..6, "timezone offset", text)?;
    if hours > 23 || minutes > 59 {
        return Err(invalid("timezone offset", text));
    }
    Ok(sign * (hours * 60 + minutes))
}

/// Parses fractional second digits, truncating past microseconds.
fn parse_fractional_seconds(frac: &str, text: &str) -> Result<i64, DateTimeParseError> {
    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("fractional seconds", text));
    }
    let mut micros = 0i64;
    for (i, b) in frac.bytes().take(6).enumerate() {
        micros += (b - b'0') as i64 * 10i64.pow(5 - i as u32);
    }
    Ok(micros)
}

/// Formats microseconds as six fractional digits, omitting them if zero.
fn format_fractional_seconds(us: i64) -> String {
    if us == 0 {
        String::new()
    } else {
        format!(".{:06}", us)
    }
}

/// Returns true if the given year is a leap year.
fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Returns the number of days in a given month (1-indexed).
fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since Unix epoch for a proleptic Gregorian date (Howard Hinnant's algorithm).
fn date_to_days(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let m = if month <= 2 { month + 9 } else { month - 3 };

    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400); // year of era
    let doy = (153 * m + 2) / 5 + day - 1; // day of year
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // day of era

    era * 146_097 + doe - 719_468
}

/// Converts days since Unix epoch to (year, month, day).
fn days_to_date(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097); // day of era
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // year of era
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153; // month index
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe + era * 400;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn format_year(year: i64) -> String {
    if (0..=9999).contains(&year) {
        format!("{:04}", year)
    } else if year < 0 {
        format!("-{:04}", -year)
    } else {
        format!("+{:04}", year)
    }
}

/// Splits the leading `[+-]YYYY-MM-DD` off `text` and returns (days, rest).
fn parse_date_prefix<'a>(s: &'a str, text: &str) -> Result<(i64, &'a str), DateTimeParseError> {
    let (sign, body) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => (1, s),
    };
    let year_len = body.bytes().take_while(u8::is_ascii_digit).count();
    if year_len < 4 || body.len() < year_len + 6 {
        return Err(invalid("date", text));
    }
    if year_len > MAX_YEAR_DIGITS {
        return Err(invalid("year", text));
    }
    let rest = &body[year_len..];
    if rest.as_bytes()[0] != b'-' || rest.as_bytes()[3] != b'-' {
        return Err(invalid("date", text));
    }
    let year = sign * parse_digits(&body[..year_len], year_len, "year", text)?;
    let month = digits_at(rest, 1..3, "month", text)?;
    let day = digits_at(rest, 4..6, "day", text)?;
    if !(1..=12).contains(&month) {
        return Err(invalid("month", text));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(invalid("day", text));
    }
    Ok((date_to_days(year, month, day), &rest[6..]))
}

/// Splits the leading `HH:MM:SS[.f+]` off `s` and returns (micros, rest).
fn parse_time_prefix<'a>(s: &'a str, text: &str) -> Result<(i64, &'a str), DateTimeParseError> {
    if s.len() < 8 || s.as_bytes()[2] != b':' || s.as_bytes()[5] != b':' {
        return Err(invalid("time", text));
    }
    let hours = digits_at(s, 0..2, "hours", text)?;
    let minutes = digits_at(s, 3..5, "minutes", text)?;
    let seconds = digits_at(s, 6..8, "seconds", text)?;
    if hours > 23 {
        return Err(invalid("hours", text));
    }
    if minutes > 59 {
        return Err(invalid("minutes", text));
    }
    if seconds > 59 {
        return Err(invalid("seconds", text));
    }

    let mut rest = &s[8..];
    let mut micros = 0;
    if let Some(frac_rest) = rest.strip_prefix('.') {
        let frac_len = frac_rest.bytes().take_while(u8::is_ascii_digit).count();
        micros = parse_fractional_seconds(&frac_rest[..frac_len], text)?;
        rest = &frac_rest[frac_len..];
    }
    Ok((
        hours * MICROS_PER_HOUR + minutes * MICROS_PER_MINUTE + seconds * MICROS_PER_SECOND + micros,
        rest,
    ))
}

// =====================
// DATE functions
// =====================

/// Parses `YYYY-MM-DD` and returns days since Unix epoch.
pub fn parse_date(text: &str) -> Result<i32, DateTimeParseError> {
    let (days, rest) = parse_date_prefix(text, text)?;
    if !rest.is_empty() {
        return Err(invalid("date", text));
    }
    i32::try_from(days).map_err(|_| invalid("date", text))
}

/// Formats days since Unix epoch as `YYYY-MM-DD`.
pub fn format_date(days: i32) -> String {
    let (year, month, day) = days_to_date(days as i64);
    format!("{}-{:02}-{:02}", format_year(year), month, day)
}

// =====================
// TIME functions
// =====================

/// Parses `HH:MM:SS[.ffffff]` and returns microseconds since midnight.
pub fn parse_time(text: &str) -> Result<i64, DateTimeParseError> {
    let (micros, rest) = parse_time_prefix(text, text)?;
    if !rest.is_empty() {
        return Err(invalid("time", text));
    }
    Ok(micros)
}

/// Formats microseconds since midnight as `HH:MM:SS[.ffffff]`.
pub fn format_time(micros: i64) -> String {
    let micros = micros.rem_euclid(MICROS_PER_DAY);
    let hours = micros / MICROS_PER_HOUR;
    let minutes = micros % MICROS_PER_HOUR / MICROS_PER_MINUTE;
    let seconds = micros % MICROS_PER_MINUTE / MICROS_PER_SECOND;
    let frac = format_fractional_seconds(micros % MICROS_PER_SECOND);
    format!("{:02}:{:02}:{:02}{}", hours, minutes, seconds, frac)
}

// =====================
// DATETIME functions
// =====================

/// Parses an RFC 3339 datetime and returns microseconds since Unix epoch, UTC.
///
/// A missing offset is read as UTC.
pub fn parse_datetime(text: &str) -> Result<i64, DateTimeParseError> {
    let (days, rest) = parse_date_prefix(text, text)?;
    let rest = match rest.as_bytes().first() {
        Some(b'T') | Some(b't') | Some(b' ') => &rest[1..],
        _ => return Err(invalid("datetime", text)),
    };
    let (time_micros, rest) = parse_time_prefix(rest, text)?;
    let offset_min = if rest.is_empty() {
        0
    } else {
        parse_timezone_offset(rest, text)?
    };

    // local time = UTC + offset, so UTC = local - offset
    days.checked_mul(MICROS_PER_DAY)
        .and_then(|v| v.checked_add(time_micros))
        .and_then(|v| v.checked_sub(offset_min * MICROS_PER_MINUTE))
        .ok_or_else(|| invalid("datetime", text))
}

/// Formats microseconds since Unix epoch as `YYYY-MM-DDTHH:MM:SS[.ffffff]Z`.
pub fn format_datetime(epoch_micros: i64) -> String {
    let days = epoch_micros.div_euclid(MICROS_PER_DAY);
    let time_micros = epoch_micros.rem_euclid(MICROS_PER_DAY);
    let (year, month, day) = days_to_date(days);
    format!(
        "{}-{:02}-{:02}T{}Z",
        format_year(year),
        month,
        day,
        format_time(time_micros)
    )
}

// =====================
// DURATION functions
// =====================

/// Parses `[-]P[nD][T[nH][nM][n[.f]S]]` and returns signed microseconds.
pub fn parse_duration(text: &str) -> Result<i64, DateTimeParseError> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let body = body.strip_prefix('P').ok_or_else(|| invalid("duration", text))?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return Err(invalid("duration", text));
            }
            (d, Some(t))
        }
        None => (body, None),
    };

    let mut total: i64 = 0;
    let mut components = 0;
    let mut add = |amount: i64, unit: i64| -> Result<(), DateTimeParseError> {
        total = amount
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| invalid("duration", text))?;
        components += 1;
        Ok(())
    };

    if !date_part.is_empty() {
        let days = date_part.strip_suffix('D').ok_or_else(|| invalid("duration", text))?;
        add(parse_component(days, text)?, MICROS_PER_DAY)?;
    }

    if let Some(mut t) = time_part {
        for (designator, unit) in [('H', MICROS_PER_HOUR), ('M', MICROS_PER_MINUTE)] {
            if let Some(idx) = t.find(designator) {
                add(parse_component(&t[..idx], text)?, unit)?;
                t = &t[idx + 1..];
            }
        }
        if !t.is_empty() {
            let seconds = t.strip_suffix('S').ok_or_else(|| invalid("duration", text))?;
            let (whole, frac) = match seconds.split_once('.') {
                Some((w, f)) => (w, Some(f)),
                None => (seconds, None),
            };
            add(parse_component(whole, text)?, MICROS_PER_SECOND)?;
            if let Some(frac) = frac {
                add(parse_fractional_seconds(frac, text)?, 1)?;
            }
        }
    }

    if components == 0 {
        return Err(invalid("duration", text));
    }
    Ok(if negative { -total } else { total })
}

fn parse_component(digits: &str, text: &str) -> Result<i64, DateTimeParseError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("duration", text));
    }
    digits.parse().map_err(|_| invalid("duration", text))
}

/// Formats signed microseconds as an ISO 8601 duration. Zero is `PT0S`.
pub fn format_duration(micros: i64) -> String {
    if micros == 0 {
        return "PT0S".to_string();
    }
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let per_day = MICROS_PER_DAY as u64;
    let per_hour = MICROS_PER_HOUR as u64;
    let per_minute = MICROS_PER_MINUTE as u64;
    let per_second = MICROS_PER_SECOND as u64;

    let days = abs / per_day;
    let hours = abs % per_day / per_hour;
    let minutes = abs % per_hour / per_minute;
    let seconds = abs % per_minute / per_second;
    let frac = abs % per_second;

    let mut out = format!("{}P", sign);
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || frac > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if seconds > 0 || frac > 0 {
            out.push_str(&seconds.to_string());
            if frac > 0 {
                let digits = format!("{:06}", frac);
                out.push('.');
                out.push_str(digits.trim_end_matches('0'));
            }
            out.push('S');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_basic() {
        assert_eq!(parse_date("1970-01-01").unwrap(), 0);
        assert_eq!(parse_date("2024-03-15").unwrap(), 19797);
        assert_eq!(parse_date("1969-12-31").unwrap(), -1);
        assert_eq!(parse_date("0001-01-01").unwrap(), -719_162);
    }

    #[test]
    fn test_date_roundtrip() {
        for date in ["1970-01-01", "2024-03-15", "2000-02-29", "1600-12-31", "+12345-06-07", "-0044-03-15"] {
            let days = parse_date(date).unwrap();
            assert_eq!(format_date(days), date, "Roundtrip failed for {}", date);
        }
    }

    #[test]
    fn test_invalid_dates() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("2024-00-01").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("2024-3-15").is_err());
        assert!(parse_date("2024-03-15Z").is_err());
        assert!(parse_date("not-a-date").is_err());
    }

    #[test]
    fn test_non_ascii_fields_rejected() {
        for text in ["2024-01-€", "2024-€-01", "2024-0€1-01", "2024é01-01", "٢٠٢٤-01-01"] {
            assert!(parse_date(text).is_err(), "{} should fail", text);
        }
        for text in ["00:00:0€", "0€:00:00", "00:€:00", "00:00:00.€", "１２:00:00"] {
            assert!(parse_time(text).is_err(), "{} should fail", text);
        }
        for text in ["2024-01-01T00:00:00+é:00", "2024-01-01T00:00:00+00:é", "2024-01-01T00:00:00+0€00", "2024-01-01T€0:00:00Z"] {
            assert!(parse_datetime(text).is_err(), "{} should fail", text);
        }
        assert!(parse_timezone_offset("+€:0", "").is_err());
        assert!(parse_duration("PT€S").is_err());
    }

    #[test]
    fn test_long_years_rejected() {
        assert_eq!(format_date(i32::MAX), "+5881580-07-11");
        assert_eq!(parse_date("+5881580-07-11").unwrap(), i32::MAX);
        assert!(parse_date("+5881580-07-12").is_err());
        assert!(parse_date("999999999-03-01").is_err());
        assert!(parse_date("999999999999999999-03-01").is_err());
        assert!(parse_date("-999999999999999999-03-01").is_err());
        assert!(parse_date("99999999999999999999999-03-01").is_err());
        assert!(parse_datetime("999999999999999999-03-01T00:00:00Z").is_err());
        assert!(parse_datetime("300000-01-01T00:00:00Z").is_err());
    }

    #[test]
    fn test_time_roundtrip() {
        assert_eq!(parse_time("14:30:00").unwrap(), 52_200_000_000);
        assert_eq!(format_time(52_200_000_000), "14:30:00");
        assert_eq!(format_time(52_200_500_000), "14:30:00.500000");
        for time in ["00:00:00", "14:30:00.123456", "23:59:59.999999"] {
            assert_eq!(format_time(parse_time(time).unwrap()), time);
        }
    }

    #[test]
    fn test_time_fraction_truncated() {
        assert_eq!(parse_time("00:00:00.5").unwrap(), 500_000);
        assert_eq!(parse_time("00:00:00.1234569").unwrap(), 123_456);
        assert!(parse_time("00:00:00.").is_err());
    }

    #[test]
    fn test_invalid_times() {
        assert!(parse_time("24:00:00").is_err());
        assert!(parse_time("14:60:00").is_err());
        assert!(parse_time("14:30:60").is_err());
        assert!(parse_time("14:30:00Z").is_err());
        assert!(parse_time("not:a:time").is_err());
    }

    #[test]
    fn test_datetime_basic() {
        assert_eq!(parse_datetime("1970-01-01T00:00:00Z").unwrap(), 0);
        assert_eq!(parse_datetime("2024-03-15T14:30:00Z").unwrap(), 1_710_513_000_000_000);
        assert_eq!(
            format_datetime(1_710_513_000_123_456),
            "2024-03-15T14:30:00.123456Z"
        );
        assert_eq!(format_datetime(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_datetime_offset_normalized_to_utc() {
        let local = parse_datetime("2024-03-15T14:30:00+05:30").unwrap();
        let utc = parse_datetime("2024-03-15T09:00:00Z").unwrap();
        assert_eq!(local, utc);
        assert_eq!(format_datetime(local), "2024-03-15T09:00:00Z");
        assert_eq!(
            parse_datetime("2024-03-15T00:30:00-01:00").unwrap(),
            parse_datetime("2024-03-15T01:30:00Z").unwrap()
        );
    }

    #[test]
    fn test_negative_epoch() {
        let micros = parse_datetime("1969-12-31T23:59:59Z").unwrap();
        assert_eq!(micros, -1_000_000);
        assert_eq!(format_datetime(micros), "1969-12-31T23:59:59Z");
        assert_eq!(format_datetime(-1), "1969-12-31T23:59:59.999999Z");
    }

    #[test]
    fn test_timezone_offset_edge_cases() {
        assert_eq!(parse_timezone_offset("+23:59", "").unwrap(), 1439);
        assert_eq!(parse_timezone_offset("-01:30", "").unwrap(), -90);
        assert!(parse_timezone_offset("+24:00", "").is_err());
        assert!(parse_timezone_offset("+0130", "").is_err());
    }

    #[test]
    fn test_duration_parse() {
        assert_eq!(parse_duration("P1D").unwrap(), MICROS_PER_DAY);
        assert_eq!(parse_duration("PT1H30M").unwrap(), 90 * MICROS_PER_MINUTE);
        assert_eq!(parse_duration("PT0.5S").unwrap(), 500_000);
        assert_eq!(parse_duration("-P1DT2S").unwrap(), -(MICROS_PER_DAY + 2 * MICROS_PER_SECOND));
        assert_eq!(parse_duration("PT90M").unwrap(), 90 * MICROS_PER_MINUTE);
    }

    #[test]
    fn test_duration_invalid() {
        for text in ["P", "PT", "1D", "P1H", "PT1D", "P1DT", "PT1.5M", "PTS", "P-1D"] {
            assert!(parse_duration(text).is_err(), "{} should fail", text);
        }
    }

    #[test]
    fn test_duration_format() {
        assert_eq!(format_duration(0), "PT0S");
        assert_eq!(format_duration(MICROS_PER_DAY + 90 * MICROS_PER_MINUTE), "P1DT1H30M");
        assert_eq!(format_duration(-1_500_000), "-PT1.5S");
        assert_eq!(format_duration(i64::MIN), "-P106751991DT4H54.775808S");
        for micros in [1, -1, 3 * MICROS_PER_DAY, 59 * MICROS_PER_SECOND + 7, i64::MAX] {
            assert_eq!(parse_duration(&format_duration(micros)).unwrap(), micros);
        }
    }
}
