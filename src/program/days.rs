//! Weekday lookup and week-anchor arithmetic.
//!
//! Model output names days in many ways ("Monday", "mon", "Day 3", 2,
//! "2025-03-05"). Everything resolves to `day_of_week` 1–7 (Monday = 1).

use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde_json::Value;

/// Weekday lookup table: lowercase name or abbreviation → day number.
pub const WEEKDAY_NAMES: &[(&str, u8)] = &[
    ("monday", 1),
    ("mon", 1),
    ("tuesday", 2),
    ("tue", 2),
    ("tues", 2),
    ("wednesday", 3),
    ("wed", 3),
    ("thursday", 4),
    ("thu", 4),
    ("thur", 4),
    ("thurs", 4),
    ("friday", 5),
    ("fri", 5),
    ("saturday", 6),
    ("sat", 6),
    ("sunday", 7),
    ("sun", 7),
];

const DISPLAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// The five school days this pipeline plans for.
pub const SCHOOL_DAYS: [u8; 5] = [1, 2, 3, 4, 5];

fn re_day_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^day[\s_\-]*([1-7])$").expect("day number regex should compile"))
}

fn re_iso_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})").expect("iso date regex should compile"))
}

/// Display name for a day number, e.g. `3` → "Wednesday".
pub fn weekday_name(day: u8) -> &'static str {
    match day {
        1..=7 => DISPLAY_NAMES[usize::from(day - 1)],
        _ => "Unknown",
    }
}

/// Strictly parse a day key: a full weekday name, an abbreviation, "day1".."day7",
/// a bare number 1–7, or an ISO date. Used for day-keyed maps where anything
/// else must be discarded.
pub fn parse_day_key(key: &str) -> Option<u8> {
    let lower = key.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    if let Some((_, day)) = WEEKDAY_NAMES.iter().find(|(name, _)| *name == lower) {
        return Some(*day);
    }
    if let Ok(n) = lower.parse::<u8>() {
        return (1..=7).contains(&n).then_some(n);
    }
    if let Some(caps) = re_day_number().captures(&lower) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = re_iso_date().captures(&lower) {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        return Some(day_of_week(date));
    }
    None
}

/// Leniently parse a day value found inside a record.
///
/// Accepts everything `parse_day_key` does, plus integral JSON numbers and
/// strings that start with a weekday name ("Monday (Heritage Day)").
pub fn parse_day_value(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => {
            let day = n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))?;
            (1..=7).contains(&day).then_some(day as u8)
        }
        Value::String(s) => parse_day_key(s).or_else(|| {
            let first_word: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect();
            parse_day_key(&first_word)
        }),
        _ => None,
    }
}

/// ISO weekday number of a date (Monday = 1).
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Monday of the week containing `date`.
pub fn week_start_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Friday of the week starting at `week_start`.
pub fn week_end_friday(week_start: NaiveDate) -> NaiveDate {
    week_start + Duration::days(4)
}

/// Calendar date of `day` (1–7) in the week starting at `week_start`.
pub fn date_for_day(week_start: NaiveDate, day: u8) -> NaiveDate {
    week_start + Duration::days(i64::from(day.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_day_key_names_and_abbreviations() {
        assert_eq!(parse_day_key("Monday"), Some(1));
        assert_eq!(parse_day_key("tue"), Some(2));
        assert_eq!(parse_day_key("WED"), Some(3));
        assert_eq!(parse_day_key("Thurs"), Some(4));
        assert_eq!(parse_day_key("sun"), Some(7));
    }

    #[test]
    fn test_parse_day_key_patterns() {
        assert_eq!(parse_day_key("day1"), Some(1));
        assert_eq!(parse_day_key("Day 5"), Some(5));
        assert_eq!(parse_day_key("day_3"), Some(3));
        assert_eq!(parse_day_key("4"), Some(4));
        // 2025-03-05 is a Wednesday
        assert_eq!(parse_day_key("2025-03-05"), Some(3));
    }

    #[test]
    fn test_parse_day_key_rejects_non_days() {
        assert_eq!(parse_day_key("notes"), None);
        assert_eq!(parse_day_key("title"), None);
        assert_eq!(parse_day_key("8"), None);
        assert_eq!(parse_day_key("day9"), None);
        assert_eq!(parse_day_key(""), None);
    }

    #[test]
    fn test_parse_day_value_numbers_and_prefixes() {
        assert_eq!(parse_day_value(&json!(2)), Some(2));
        assert_eq!(parse_day_value(&json!(3.0)), Some(3));
        assert_eq!(parse_day_value(&json!(0)), None);
        assert_eq!(parse_day_value(&json!("Friday (Good Friday)")), Some(5));
        assert_eq!(parse_day_value(&json!("2025-03-07T08:00:00Z")), Some(5));
        assert_eq!(parse_day_value(&json!(null)), None);
    }

    #[test]
    fn test_week_start_monday() {
        assert_eq!(week_start_monday(date("2025-03-05")), date("2025-03-03"));
        assert_eq!(week_start_monday(date("2025-03-03")), date("2025-03-03"));
        assert_eq!(week_start_monday(date("2025-03-09")), date("2025-03-03"));
    }

    #[test]
    fn test_week_end_friday() {
        assert_eq!(week_end_friday(date("2025-03-03")), date("2025-03-07"));
        assert_eq!(date_for_day(date("2025-03-03"), 3), date("2025-03-05"));
    }

    #[test]
    fn test_weekday_name() {
        assert_eq!(weekday_name(1), "Monday");
        assert_eq!(weekday_name(3), "Wednesday");
        assert_eq!(weekday_name(0), "Unknown");
    }
}
