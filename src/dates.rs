use std::ops::RangeInclusive;

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Full names come before abbreviations so alternation prefers the longest match.
const MONTH_ALTERNATION: &str = "january|february|march|april|may|june|july|august|september|\
october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

const FORMAT_TEMPLATES: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%d %B %Y",
    "%d %b %Y",
    "%d %B, %Y",
    "%B %d %Y",
];

const PLAUSIBLE_YEARS: RangeInclusive<i32> = 1900..=2100;

const MICROS_PER_DAY: i64 = 86_400 * 1_000_000;

static WEEKDAY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b\s*,?\s*")
        .expect("weekday prefix regex")
});

static MONTH_FIRST_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTH_ALTERNATION})\s+(\d{{1,2}})\s*[-–]\s*(\d{{1,2}}),\s*(\d{{4}})\b"
    ))
    .expect("month-first range regex")
});

static DAY_FIRST_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s*[-–]\s*(\d{{1,2}})\s+({MONTH_ALTERNATION})\b"
    ))
    .expect("day-first range regex")
});

static ORDINAL_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal suffix regex")
});

static EMBEDDED_MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTH_ALTERNATION})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\s*,?\s*(\d{{4}})\b"
    ))
    .expect("embedded month-day-year regex")
});

static EMBEDDED_DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTH_ALTERNATION})\.?\s*,?\s*(\d{{4}})\b"
    ))
    .expect("embedded day-month-year regex")
});

/// Parses a scraped deadline string into a calendar date.
///
/// Returns `None` for empty, placeholder ("TBD", "August", "November onwards")
/// or otherwise unrecognisable text. Never panics.
pub fn normalize_deadline_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned = clean_deadline_text(trimmed);

    parse_with_templates(&cleaned)
        .or_else(|| scan_month_day_year(&cleaned))
        .or_else(|| scan_day_month_year(&cleaned))
}

/// Weekday prefix and ordinal suffixes removed, ranges collapsed.
fn clean_deadline_text(text: &str) -> String {
    let text = WEEKDAY_PREFIX.replace(text, "");
    // Ordinals go first so "1st-3rd" reads as a range.
    let text = ORDINAL_SUFFIX.replace_all(&text, "${1}");
    // The end of a range is the binding date.
    let text = MONTH_FIRST_RANGE.replace(&text, "${1} ${3}, ${4}");
    let text = DAY_FIRST_RANGE.replace(&text, "${2} ${3}");
    text.trim().to_string()
}

fn parse_with_templates(text: &str) -> Option<NaiveDate> {
    FORMAT_TEMPLATES.iter().find_map(|template| {
        NaiveDate::parse_from_str(text, template)
            .ok()
            .filter(|date| PLAUSIBLE_YEARS.contains(&date.year()))
    })
}

fn scan_month_day_year(text: &str) -> Option<NaiveDate> {
    EMBEDDED_MONTH_DAY_YEAR.captures_iter(text).find_map(|caps| {
        build_date(&caps[3], month_number(&caps[1])?, &caps[2])
    })
}

fn scan_day_month_year(text: &str) -> Option<NaiveDate> {
    EMBEDDED_DAY_MONTH_YEAR.captures_iter(text).find_map(|caps| {
        build_date(&caps[3], month_number(&caps[2])?, &caps[1])
    })
}

fn build_date(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    let year: i32 = year.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    if !PLAUSIBLE_YEARS.contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// "Today" plus the zone deadlines are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineClock {
    pub today: NaiveDate,
    pub offset: FixedOffset,
}

impl DeadlineClock {
    pub fn now(offset: FixedOffset) -> Self {
        Self {
            today: Utc::now().with_timezone(&offset).date_naive(),
            offset,
        }
    }

    pub fn fixed(today: NaiveDate, offset: FixedOffset) -> Self {
        Self { today, offset }
    }

    /// Unix seconds at 23:59:59.999999 local time on `date`.
    pub fn end_of_day_timestamp(&self, date: NaiveDate) -> f64 {
        let next_midnight = self.local_midnight_micros(date) + MICROS_PER_DAY;
        (next_midnight - 1) as f64 / 1_000_000.0
    }

    /// Unix seconds at 00:00:00 local time today.
    pub fn start_of_today_timestamp(&self) -> f64 {
        self.local_midnight_micros(self.today) as f64 / 1_000_000.0
    }

    /// A deadline due today is still upcoming.
    pub fn is_past(&self, date: NaiveDate) -> bool {
        self.end_of_day_timestamp(date) < self.start_of_today_timestamp()
    }

    fn local_midnight_micros(&self, date: NaiveDate) -> i64 {
        let local = date.and_time(NaiveTime::MIN);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        utc.and_utc().timestamp_micros()
    }
}
