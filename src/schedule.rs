//! Human-friendly publish times
//!
//! Accepted forms, all resolved against a caller-supplied `now`:
//! - relative: `in 5m`, `in 2h`, `in 1d`, `in 30 minutes`, `in 2 hours`
//! - clock time: `15:00`, `3pm` (today, or tomorrow once it has passed)
//! - local date and time: `2030-01-15 14:30`, `2030-01-15T14:30`
//! - RFC 3339: `2030-01-15T14:30:00+07:00`

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{Error, Result};

const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Resolve `input` to an instant
pub fn parse_when(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("a publish time is required"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let lowered = trimmed.to_lowercase();
    if let Some(rest) = lowered.strip_prefix("in ") {
        return relative(rest, now);
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return local_to_utc(naive);
        }
    }

    if let Some(time) = clock_time(&lowered) {
        return next_occurrence(time, now);
    }

    Err(Error::invalid(format!(
        "could not read '{trimmed}' as a time (try 'in 30m', '15:00' or 'YYYY-MM-DD HH:MM')"
    )))
}

fn relative(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    let amount_and_unit = match input.split_whitespace().collect::<Vec<_>>().as_slice() {
        [amount, unit] => Some(((*amount).to_string(), unit.trim_end_matches('s').to_string())),
        [compact] => {
            let split = compact
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(compact.len());
            let (amount, unit) = compact.split_at(split);
            Some((amount.to_string(), unit.to_string()))
        }
        _ => None,
    };

    let duration = amount_and_unit.and_then(|(amount, unit)| {
        let amount: i64 = amount.parse().ok()?;
        match unit.as_str() {
            "s" | "sec" | "second" => Some(Duration::seconds(amount)),
            "m" | "min" | "minute" => Some(Duration::minutes(amount)),
            "h" | "hr" | "hour" => Some(Duration::hours(amount)),
            "d" | "day" => Some(Duration::days(amount)),
            "w" | "week" => Some(Duration::weeks(amount)),
            _ => None,
        }
    });

    duration
        .map(|d| now + d)
        .ok_or_else(|| Error::invalid(format!("could not read relative time 'in {input}'")))
}

fn clock_time(input: &str) -> Option<NaiveTime> {
    for format in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(input, format) {
            return Some(time);
        }
    }

    let compact = input.replace(' ', "");
    let (digits, pm) = if let Some(d) = compact.strip_suffix("pm") {
        (d, true)
    } else {
        (compact.strip_suffix("am")?, false)
    };

    let (hour, minute) = digits.split_once(':').unwrap_or((digits, "0"));
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }

    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn next_occurrence(time: NaiveTime, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let today = now.with_timezone(&Local).date_naive();
    let candidate = local_to_utc(today.and_time(time))?;
    if candidate > now {
        Ok(candidate)
    } else {
        local_to_utc((today + Duration::days(1)).and_time(time))
    }
}

fn local_to_utc(naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::invalid(format!("{naive} is ambiguous or skipped in local time")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_forms() {
        assert_eq!(parse_when("in 5m", now()).unwrap(), now() + Duration::minutes(5));
        assert_eq!(parse_when("in 2 hours", now()).unwrap(), now() + Duration::hours(2));
        assert_eq!(parse_when("In 1d", now()).unwrap(), now() + Duration::days(1));
        assert!(parse_when("in 5 fortnights", now()).is_err());
    }

    #[test]
    fn test_rfc3339() {
        let when = parse_when("2030-01-15T14:30:00+07:00", now()).unwrap();
        assert_eq!(when, Utc.with_ymd_and_hms(2030, 1, 15, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_local_datetime() {
        let when = parse_when("2030-01-15 14:30", now()).unwrap();
        let local = when.with_timezone(&Local);
        assert_eq!((local.year(), local.month(), local.day()), (2030, 1, 15));
    }

    #[test]
    fn test_clock_time_is_in_future() {
        let when = parse_when("3pm", now()).unwrap();
        assert!(when > now());
        assert!(when - now() <= Duration::days(1));
        assert!(parse_when("13pm", now()).is_err());
    }

    #[test]
    fn test_garbage() {
        let err = parse_when("tomorrow-ish", now()).unwrap_err();
        assert_eq!(err.code(), "invalid-argument");
        assert!(parse_when("  ", now()).is_err());
    }
}
