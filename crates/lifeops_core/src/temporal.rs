//! Temporal parser collaborator.
//!
//! Date/time fields may arrive as free text from the assistant layer. The
//! handlers only depend on `TemporalParser`; `NaturalDateParser` is the
//! default implementation.
//!
//! # Invariants
//! - Parsing never panics; unrecognized input yields `None`.
//! - Values without an explicit offset are interpreted as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(now|today|tomorrow|yesterday)(?:\s+at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?)?$")
        .expect("valid relative day regex")
});
static OFFSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^in\s+(\d{1,4})\s+(minutes?|mins?|hours?|hrs?|days?|weeks?)$")
        .expect("valid offset regex")
});

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses free-text date/time values.
pub trait TemporalParser {
    /// Parses `text` relative to `now`.
    fn parse(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// Parses a calendar date. Defaults to the date part of `parse`.
    fn parse_date(&self, text: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
        self.parse(text, now).map(|value| value.date_naive())
    }
}

/// Default parser: ISO 8601 / RFC 3339 shapes plus a small relative vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalDateParser;

impl TemporalParser for NaturalDateParser {
    fn parse(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let normalized = text.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Ok(value) = DateTime::parse_from_rfc3339(text.trim()) {
            return Some(value.with_timezone(&Utc));
        }

        let upper = normalized.to_ascii_uppercase();
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(value) = NaiveDateTime::parse_from_str(&upper, format) {
                return Some(value.and_utc());
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }

        if let Some(caps) = RELATIVE_DAY_RE.captures(&normalized) {
            return parse_relative_day(&caps, now);
        }

        if let Some(caps) = OFFSET_RE.captures(&normalized) {
            let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
            let unit = caps.get(2)?.as_str();
            let delta = match unit.chars().next()? {
                'm' => TimeDelta::try_minutes(amount)?,
                'h' => TimeDelta::try_hours(amount)?,
                'd' => TimeDelta::try_days(amount)?,
                'w' => TimeDelta::try_weeks(amount)?,
                _ => return None,
            };
            return now.checked_add_signed(delta);
        }

        if normalized.chars().all(|c| c.is_ascii_digit()) && normalized.len() >= 10 {
            let epoch_ms: i64 = normalized.parse().ok()?;
            return DateTime::from_timestamp_millis(epoch_ms);
        }

        None
    }
}

fn parse_relative_day(caps: &regex::Captures<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let keyword = caps.get(1)?.as_str();
    let base = match keyword {
        "now" => return Some(now),
        "today" => now.date_naive(),
        "tomorrow" => now.date_naive().succ_opt()?,
        "yesterday" => now.date_naive().pred_opt()?,
        _ => return None,
    };

    let time = match caps.get(2) {
        Some(hour) => {
            let mut hour: u32 = hour.as_str().parse().ok()?;
            let minute: u32 = caps
                .get(3)
                .map_or(Some(0), |value| value.as_str().parse().ok())?;
            match caps.get(4).map(|value| value.as_str()) {
                Some("pm") if hour < 12 => hour += 12,
                Some("am") if hour == 12 => hour = 0,
                _ => {}
            }
            NaiveTime::from_hms_opt(hour, minute, 0)?
        }
        None => NaiveTime::MIN,
    };
    Some(base.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::{NaturalDateParser, TemporalParser};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 30, 0)
            .single()
            .expect("valid fixed time")
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .expect("valid time")
    }

    #[test]
    fn parses_iso_shapes() {
        let parser = NaturalDateParser;
        assert_eq!(
            parser.parse("2025-01-01T10:00", now()),
            Some(at(2025, 1, 1, 10, 0))
        );
        assert_eq!(
            parser.parse("2025-01-01 09:15:00", now()),
            Some(at(2025, 1, 1, 9, 15))
        );
        assert_eq!(
            parser.parse("2025-01-01T10:00:00+02:00", now()),
            Some(at(2025, 1, 1, 8, 0))
        );
        assert_eq!(
            parser.parse("2025-01-01", now()),
            Some(at(2025, 1, 1, 0, 0))
        );
    }

    #[test]
    fn parses_relative_vocabulary() {
        let parser = NaturalDateParser;
        assert_eq!(parser.parse("now", now()), Some(now()));
        assert_eq!(parser.parse("Today", now()), Some(at(2025, 3, 10, 0, 0)));
        assert_eq!(
            parser.parse("tomorrow at 3pm", now()),
            Some(at(2025, 3, 11, 15, 0))
        );
        assert_eq!(
            parser.parse("yesterday at 12:30am", now()),
            Some(at(2025, 3, 9, 0, 30))
        );
        assert_eq!(
            parser.parse("in 2 hours", now()),
            Some(at(2025, 3, 10, 10, 30))
        );
        assert_eq!(
            parser.parse_date("in 1 week", now()),
            NaiveDate::from_ymd_opt(2025, 3, 17)
        );
    }

    #[test]
    fn rejects_garbage_and_invalid_clock_values() {
        let parser = NaturalDateParser;
        assert_eq!(parser.parse("", now()), None);
        assert_eq!(parser.parse("whenever", now()), None);
        assert_eq!(parser.parse("today at 25:00", now()), None);
        assert_eq!(parser.parse("2025-02-30", now()), None);
    }
}
