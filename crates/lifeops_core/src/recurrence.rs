//! Recurrence engine collaborator.
//!
//! Events store recurrence rules as opaque strings. The engine is only
//! consulted when a rule is present: to reject rules that expand to nothing
//! and to compute the next occurrence for event views.

use chrono::{DateTime, Months, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RRULE_PART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+)=([A-Z0-9,]+)$").expect("valid rrule part regex"));

const MAX_INTERVAL: u32 = 366;

/// Expands recurrence rules into concrete occurrence timestamps.
pub trait RecurrenceEngine {
    /// Returns up to `limit` occurrences of `rule`, starting at `from`.
    fn expand(&self, rule: &str, from: DateTime<Utc>, limit: usize) -> Vec<DateTime<Utc>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freq {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rule {
    freq: Freq,
    interval: u32,
    count: Option<usize>,
}

/// Supports `daily|weekly|monthly|yearly` shorthands and RRULE-style
/// `FREQ=...;INTERVAL=n;COUNT=n` strings (optionally prefixed by `RRULE:`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleRecurrence;

impl RuleRecurrence {
    fn parse_rule(rule: &str) -> Option<Rule> {
        let normalized = rule.trim().to_ascii_uppercase();
        let body = normalized.strip_prefix("RRULE:").unwrap_or(&normalized);

        if let Some(freq) = parse_freq(body) {
            return Some(Rule {
                freq,
                interval: 1,
                count: None,
            });
        }

        let mut freq = None;
        let mut interval = 1;
        let mut count = None;
        for part in body.split(';').filter(|part| !part.is_empty()) {
            let caps = RRULE_PART_RE.captures(part)?;
            let value = caps.get(2)?.as_str();
            match caps.get(1)?.as_str() {
                "FREQ" => freq = Some(parse_freq(value)?),
                "INTERVAL" => interval = value.parse().ok()?,
                "COUNT" => count = Some(value.parse().ok()?),
                // BYDAY/UNTIL and friends are stored verbatim but not expanded.
                _ => {}
            }
        }

        if interval == 0 || interval > MAX_INTERVAL {
            return None;
        }
        Some(Rule {
            freq: freq?,
            interval,
            count,
        })
    }
}

impl RecurrenceEngine for RuleRecurrence {
    fn expand(&self, rule: &str, from: DateTime<Utc>, limit: usize) -> Vec<DateTime<Utc>> {
        let Some(rule) = Self::parse_rule(rule) else {
            return Vec::new();
        };
        let limit = rule.count.map_or(limit, |count| count.min(limit));

        let mut occurrences = Vec::with_capacity(limit);
        let mut current = Some(from);
        while let Some(at) = current {
            if occurrences.len() >= limit {
                break;
            }
            occurrences.push(at);
            current = step(at, rule.freq, rule.interval);
        }
        occurrences
    }
}

fn parse_freq(value: &str) -> Option<Freq> {
    match value {
        "DAILY" => Some(Freq::Daily),
        "WEEKLY" => Some(Freq::Weekly),
        "MONTHLY" => Some(Freq::Monthly),
        "YEARLY" | "ANNUALLY" => Some(Freq::Yearly),
        _ => None,
    }
}

fn step(at: DateTime<Utc>, freq: Freq, interval: u32) -> Option<DateTime<Utc>> {
    match freq {
        Freq::Daily => at.checked_add_signed(TimeDelta::try_days(i64::from(interval))?),
        Freq::Weekly => at.checked_add_signed(TimeDelta::try_weeks(i64::from(interval))?),
        Freq::Monthly => at.checked_add_months(Months::new(interval)),
        Freq::Yearly => at.checked_add_months(Months::new(interval.checked_mul(12)?)),
    }
}
