//! Shared utilities for CLI commands.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use sx_core::Scope;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn days_before(today: NaiveDate, days: i64) -> Result<DateTime<Utc>> {
    today
        .checked_sub_signed(Duration::days(days))
        .map(midnight)
        .context("date out of range")
}

/// Parse a date filter relative to the current time.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    parse_date_at(s, Utc::now())
}

/// Parse a date filter relative to `now`.
///
/// Supports:
/// - RFC 3339: "2026-01-15T10:30:00Z"
/// - Calendar dates: "2026-01-15"
/// - "today", "yesterday", "last week", "last month"
/// - Relative: "30 minutes ago", "2 hours ago", "3 days ago", "1 week ago"
///
/// Everything except minute and hour offsets resolves to midnight UTC.
pub fn parse_date_at(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(midnight(date));
    }

    let today = now.date_naive();
    let lower = s.to_lowercase();
    match lower.as_str() {
        "today" => return Ok(midnight(today)),
        "yesterday" => return days_before(today, 1),
        "last week" => return days_before(today, 7),
        "last month" => {
            return today
                .checked_sub_months(Months::new(1))
                .map(midnight)
                .context("date out of range");
        }
        _ => {}
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(&lower) else {
        anyhow::bail!(
            "Invalid date: {s}. Use RFC 3339 (e.g., 2026-01-15T10:30:00Z), YYYY-MM-DD, \
             'today', 'yesterday', 'last week', 'last month' or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    match &caps[2] {
        "minute" | "hour" => Ok(now - Duration::minutes(n * minutes_per_unit)),
        _ => days_before(today, n * minutes_per_unit / (60 * 24)),
    }
}

/// Parse optional `--after`/`--before` values.
pub fn parse_range(
    after: Option<&str>,
    before: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let after = after.map(parse_date).transpose().context("invalid --after")?;
    let before = before.map(parse_date).transpose().context("invalid --before")?;
    Ok((after, before))
}

/// The `--cwd` value made absolute, or the process working directory when the
/// scope needs one.
pub fn resolve_cwd(scope: Scope, cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(cwd) if cwd.is_absolute() => Ok(cwd),
        Some(cwd) => std::path::absolute(&cwd)
            .with_context(|| format!("failed to resolve --cwd {}", cwd.display())),
        None if !scope.needs_cwd() => Ok(PathBuf::from("/")),
        None => std::env::current_dir().context("failed to determine current directory"),
    }
}

/// Formats seconds as "Xh Ym", "Xm" or "Xs".
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0s".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else if minutes >= 1 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}

/// Formats a timestamp as "YYYY-MM-DD HH:MM".
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_rfc3339_and_calendar_date() {
        assert_eq!(
            parse_date_at("2026-01-15T10:30:00+02:00", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("2026-01-15", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_named_days() {
        assert_eq!(
            parse_date_at("today", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("Yesterday", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("last week", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("last month", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(
            parse_date_at("30 minutes ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("2 hours ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 15, 12, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("3 days ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 12, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_at("1 week ago", now()).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_date_at("next tuesday", now()).is_err());
        assert!(parse_date_at("2026-13-45", now()).is_err());
        assert!(parse_date_at("99999999999 weeks ago", now()).is_err());
    }

    #[test]
    fn test_resolve_cwd() {
        let explicit = resolve_cwd(Scope::Project, Some(PathBuf::from("/home/sami/api"))).unwrap();
        assert_eq!(explicit, PathBuf::from("/home/sami/api"));
        assert_eq!(resolve_cwd(Scope::All, None).unwrap(), PathBuf::from("/"));
        assert!(resolve_cwd(Scope::Children, None).unwrap().is_absolute());
    }

    #[test]
    fn test_resolve_relative_cwd() {
        let here = std::env::current_dir().unwrap();
        assert_eq!(
            resolve_cwd(Scope::Project, Some(PathBuf::from("sub/dir"))).unwrap(),
            here.join("sub/dir")
        );
        assert_eq!(
            resolve_cwd(Scope::Parent, Some(PathBuf::from("."))).unwrap(),
            here
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(-5), "0s");
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(150), "2m");
        assert_eq!(format_duration(3_900), "1h 5m");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(Utc.with_ymd_and_hms(2026, 1, 29, 9, 5, 0).unwrap()),
            "2026-01-29 09:05"
        );
    }
}
