use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use std::collections::HashSet;

// US Eastern standard time. Quote timestamps are treated as EST all year; the one-hour DST
// skew does not matter for hourly sentiment buckets.
const EASTERN_OFFSET_SECS: i32 = -5 * 3600;

// NYSE closes at 16:00 ET; before that the latest complete session is the previous one.
const CLOSE_CUTOFF_HOUR_ET: u32 = 16;

fn eastern() -> Option<chrono::FixedOffset> {
    chrono::FixedOffset::east_opt(EASTERN_OFFSET_SECS)
}

/// Parses provider timestamps like `2026-01-02 15:55:00` (US/Eastern) into UTC.
pub fn parse_eastern_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    let dt = eastern()?.from_local_datetime(&naive).single()?;
    Some(dt.with_timezone(&Utc))
}

/// Most recent completed NYSE session date as of `now_utc`.
pub fn last_session_date(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let et = eastern().context("invalid US/Eastern offset")?;
    let now_et = now_utc.with_timezone(&et);
    let mut date = now_et.date_naive();
    if now_et.hour() < CLOSE_CUTOFF_HOUR_ET {
        date = date - Duration::days(1);
    }

    let holidays = configured_holidays();
    while !is_session(date, &holidays) {
        date = date - Duration::days(1);
    }
    Ok(date)
}

/// `n` consecutive sessions ending at (and including) `end`, oldest first.
pub fn sessions_ending_at(end: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let holidays = configured_holidays();
    let mut out = Vec::with_capacity(n);
    let mut cur = end;
    while out.len() < n {
        if is_session(cur, &holidays) {
            out.push(cur);
        }
        cur = cur - Duration::days(1);
    }
    out.reverse();
    out
}

/// The `n` sessions strictly after `start`.
pub fn sessions_after(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let holidays = configured_holidays();
    let mut out = Vec::with_capacity(n);
    let mut cur = start;
    while out.len() < n {
        cur = cur + Duration::days(1);
        if is_session(cur, &holidays) {
            out.push(cur);
        }
    }
    out
}

/// Calendar days `start+1 ..= start+n`.
pub fn days_after(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (1..=n as i64).map(|i| start + Duration::days(i)).collect()
}

/// Calendar days ending at `end`, oldest first.
pub fn days_ending_at(end: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n as i64).rev().map(|i| end - Duration::days(i)).collect()
}

/// Monday = 0 .. Sunday = 6.
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

fn is_session(date: NaiveDate, holidays: &HashSet<NaiveDate>) -> bool {
    !is_weekend(date) && !holidays.contains(&date)
}

fn configured_holidays() -> HashSet<NaiveDate> {
    // Fixed-date closures only. Extend via US_MARKET_HOLIDAYS="YYYY-MM-DD,YYYY-MM-DD".
    let mut out = HashSet::new();
    for y in 2024..=2030 {
        for (m, d) in [(1, 1), (6, 19), (7, 4), (12, 25)] {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                out.insert(date);
            }
        }
    }

    if let Ok(s) = std::env::var("US_MARKET_HOLIDAYS") {
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Ok(d) = NaiveDate::parse_from_str(part, "%Y-%m-%d") {
                out.insert(d);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_eastern_timestamp_to_utc() {
        let dt = parse_eastern_timestamp("2026-01-02 15:55:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-01-02T20:55:00+00:00");
        assert!(parse_eastern_timestamp("2026-01-02").is_none());
    }

    #[test]
    fn uses_previous_session_before_close() {
        // 2026-01-06 15:00 UTC = 10:00 ET on a Tuesday.
        let now = Utc.with_ymd_and_hms(2026, 1, 6, 15, 0, 0).unwrap();
        assert_eq!(
            last_session_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
    }

    #[test]
    fn rolls_back_over_weekend_and_new_year() {
        // 2026-01-04 is Sunday; Jan 1 is closed, so the last session is Friday Jan 2.
        let now = Utc.with_ymd_and_hms(2026, 1, 4, 23, 0, 0).unwrap();
        assert_eq!(
            last_session_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()
        );
    }

    #[test]
    fn session_windows_skip_weekends() {
        let fri = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        let next = sessions_after(fri, 2);
        assert_eq!(next[0], NaiveDate::from_ymd_opt(2026, 1, 12).unwrap());
        assert_eq!(next[1], NaiveDate::from_ymd_opt(2026, 1, 13).unwrap());

        let back = sessions_ending_at(fri, 6);
        assert_eq!(back.len(), 6);
        assert_eq!(back[0], NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        assert!(back.iter().all(|d| !is_weekend(*d)));
    }

    #[test]
    fn weekday_index_starts_monday() {
        let mon = NaiveDate::from_ymd_opt(2026, 1, 12).unwrap();
        assert_eq!(weekday_index(mon), 0);
        assert_eq!(weekday_index(mon + Duration::days(6)), 6);
    }
}
