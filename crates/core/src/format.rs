//! Display helpers for numbers, dates and sentiment scores.

use chrono::{DateTime, Utc};

/// Groups the integer part with commas: `1234567.5` -> `"1,234,567.5"`.
///
/// At most three fraction digits are kept and trailing zeros are dropped.
pub fn format_number(num: f64) -> String {
    let s = format!("{:.3}", num.abs());
    let (int_part, frac_part) = s.split_once('.').unwrap_or((&s, ""));
    let frac_part = frac_part.trim_end_matches('0');

    let sign = if num < 0.0 && s.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    if frac_part.is_empty() {
        format!("{sign}{}", group_thousands(int_part))
    } else {
        format!("{sign}{}.{frac_part}", group_thousands(int_part))
    }
}

/// `-1234.5` -> `"-$1,234.50"`.
pub fn format_currency(amount: f64) -> String {
    let s = format!("{:.2}", amount.abs());
    let (int_part, cents) = s.split_once('.').unwrap_or((&s, "00"));
    let sign = if amount < 0.0 && s != "0.00" { "-" } else { "" };
    format!("{sign}${}.{cents}", group_thousands(int_part))
}

/// Signed percent with two decimals. The input is already in percent: `5.26` -> `"+5.26%"`.
pub fn format_percent(value: f64) -> String {
    let s = format!("{:.2}", value.abs());
    if s == "0.00" {
        return "0.00%".to_string();
    }
    let sign = if value > 0.0 { "+" } else { "-" };
    format!("{sign}{s}%")
}

/// Short K/M/B/T notation with at most one decimal: `1_500` -> `"1.5K"`.
pub fn format_compact(num: f64) -> String {
    const UNITS: [(f64, &str); 4] = [
        (1e12, "T"),
        (1e9, "B"),
        (1e6, "M"),
        (1e3, "K"),
    ];

    let abs = num.abs();
    let sign = if num < 0.0 { "-" } else { "" };
    if abs < 1_000.0 {
        return format!("{sign}{}", trim_decimal(&format!("{abs:.1}")));
    }

    // Walk up from the smallest unit so 999_950 rolls over to "1M" rather than "1000K".
    let mut idx = UNITS.len() - 1;
    loop {
        let (div, suffix) = UNITS[idx];
        let scaled = (abs / div * 10.0).round() / 10.0;
        if scaled >= 1_000.0 && idx > 0 {
            idx -= 1;
            continue;
        }
        return format!("{sign}{}{suffix}", trim_decimal(&format!("{scaled:.1}")));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateStyle {
    Short,
    #[default]
    Medium,
    Long,
}

pub fn format_date(at: DateTime<Utc>, style: DateStyle) -> String {
    let pattern = match style {
        DateStyle::Short => "%b %-d, %I:%M %p",
        DateStyle::Medium => "%B %-d, %Y, %I:%M %p",
        DateStyle::Long => "%A, %B %-d, %Y, %I:%M %p",
    };
    at.format(pattern).to_string()
}

pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{days}d ago");
    }
    format_date(at, DateStyle::Short)
}

/// Five-band reading of a sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBand {
    VeryBullish,
    Bullish,
    Neutral,
    Bearish,
    VeryBearish,
}

impl SentimentBand {
    pub fn of(sentiment: f64) -> Self {
        if sentiment > 0.6 {
            SentimentBand::VeryBullish
        } else if sentiment > 0.2 {
            SentimentBand::Bullish
        } else if sentiment > -0.2 {
            SentimentBand::Neutral
        } else if sentiment > -0.6 {
            SentimentBand::Bearish
        } else {
            SentimentBand::VeryBearish
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SentimentBand::VeryBullish => "Very Bullish",
            SentimentBand::Bullish => "Bullish",
            SentimentBand::Neutral => "Neutral",
            SentimentBand::Bearish => "Bearish",
            SentimentBand::VeryBearish => "Very Bearish",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            SentimentBand::VeryBullish => "rgb(0, 200, 83)",
            SentimentBand::Bullish => "rgb(75, 181, 67)",
            SentimentBand::Neutral => "rgb(107, 114, 128)",
            SentimentBand::Bearish => "rgb(239, 68, 68)",
            SentimentBand::VeryBearish => "rgb(220, 38, 38)",
        }
    }
}

pub fn sentiment_class(sentiment: f64) -> &'static str {
    if sentiment > 0.2 {
        "sentiment-positive"
    } else if sentiment < -0.2 {
        "sentiment-negative"
    } else {
        "sentiment-neutral"
    }
}

pub fn sentiment_symbol(sentiment: f64) -> &'static str {
    if sentiment > 0.2 {
        "↑"
    } else if sentiment < -0.2 {
        "↓"
    } else {
        "→"
    }
}

pub fn sentiment_description(sentiment: f64) -> &'static str {
    SentimentBand::of(sentiment).description()
}

pub fn sentiment_color(sentiment: f64) -> &'static str {
    SentimentBand::of(sentiment).color()
}

/// Translucent fill whose opacity grows with the strength of the reading.
pub fn sentiment_gradient(sentiment: f64) -> String {
    if sentiment > 0.2 {
        let intensity = ((sentiment + 0.2) / 1.2).min(1.0);
        format!("rgba(75, 181, 67, {})", trim_decimal(&format!("{intensity:.2}")))
    } else if sentiment < -0.2 {
        let intensity = ((sentiment.abs() + 0.2) / 1.2).min(1.0);
        format!("rgba(239, 68, 68, {})", trim_decimal(&format!("{intensity:.2}")))
    } else {
        "rgba(107, 114, 128, 0.5)".to_string()
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn trim_decimal(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn numbers_and_money() {
        assert_eq!(format_number(1_234_567.5), "1,234,567.5");
        assert_eq!(format_number(-999.0), "-999");
        assert_eq!(format_number(0.1234), "0.123");
        assert_eq!(format_currency(5_214.3), "$5,214.30");
        assert_eq!(format_currency(-0.5), "-$0.50");
    }

    #[test]
    fn percent_is_signed_except_zero() {
        assert_eq!(format_percent(5.26), "+5.26%");
        assert_eq!(format_percent(-1.2), "-1.20%");
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_percent(-0.001), "0.00%");
    }

    #[test]
    fn compact_suffixes() {
        assert_eq!(format_compact(999.0), "999");
        assert_eq!(format_compact(1_500.0), "1.5K");
        assert_eq!(format_compact(2_000_000.0), "2M");
        assert_eq!(format_compact(2_345_678_901.0), "2.3B");
        assert_eq!(format_compact(999_950.0), "1M");
    }

    #[test]
    fn dates_and_relative_time() {
        let at = Utc.with_ymd_and_hms(2026, 1, 8, 21, 5, 0).unwrap();
        assert_eq!(format_date(at, DateStyle::Short), "Jan 8, 09:05 PM");
        assert_eq!(format_date(at, DateStyle::Medium), "January 8, 2026, 09:05 PM");

        assert_eq!(format_time_ago(at, at + Duration::seconds(30)), "just now");
        assert_eq!(format_time_ago(at, at + Duration::minutes(5)), "5m ago");
        assert_eq!(format_time_ago(at, at + Duration::hours(3)), "3h ago");
        assert_eq!(format_time_ago(at, at + Duration::days(2)), "2d ago");
        assert_eq!(format_time_ago(at, at + Duration::days(9)), "Jan 8, 09:05 PM");
    }

    #[test]
    fn sentiment_bands() {
        assert_eq!(sentiment_description(0.7), "Very Bullish");
        assert_eq!(sentiment_description(0.2), "Neutral");
        assert_eq!(sentiment_description(-0.61), "Very Bearish");
        assert_eq!(sentiment_class(0.21), "sentiment-positive");
        assert_eq!(sentiment_symbol(-0.5), "↓");
        assert_eq!(sentiment_color(0.0), "rgb(107, 114, 128)");
        assert_eq!(sentiment_gradient(1.0), "rgba(75, 181, 67, 1)");
        assert_eq!(sentiment_gradient(-0.4), "rgba(239, 68, 68, 0.5)");
        assert_eq!(sentiment_gradient(0.1), "rgba(107, 114, 128, 0.5)");
    }
}
