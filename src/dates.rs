use std::sync::LazyLock;

use chrono::{DateTime, Months, NaiveDate, TimeDelta, Utc};
use regex::Regex;

static RELATIVE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d+)\s+(years?|months?|weeks?|days?|hours?|mins?|minutes?|seconds?|sec)\s+ago$",
    )
    .unwrap()
});

const ABSOLUTE_DATE_FORMAT: &str = "%B %d, %Y";

/// Parses "3 days ago" (relative to `now`) or "March 07, 2024".
pub fn parse_chapter_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let Some(caps) = RELATIVE_DATE_RE.captures(text) else {
        return NaiveDate::parse_from_str(text, ABSOLUTE_DATE_FORMAT)
            .ok()?
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc());
    };

    let amount: u32 = caps[1].parse().ok()?;
    let unit = caps[2].to_ascii_lowercase();
    let delta = |make: fn(i64) -> Option<TimeDelta>| make(i64::from(amount));

    if unit.starts_with("year") {
        now.checked_sub_months(Months::new(amount.checked_mul(12)?))
    } else if unit.starts_with("month") {
        now.checked_sub_months(Months::new(amount))
    } else if unit.starts_with("week") {
        now.checked_sub_signed(delta(TimeDelta::try_weeks)?)
    } else if unit.starts_with("day") {
        now.checked_sub_signed(delta(TimeDelta::try_days)?)
    } else if unit.starts_with("hour") {
        now.checked_sub_signed(delta(TimeDelta::try_hours)?)
    } else if unit.starts_with("min") {
        now.checked_sub_signed(delta(TimeDelta::try_minutes)?)
    } else {
        now.checked_sub_signed(delta(TimeDelta::try_seconds)?)
    }
}
