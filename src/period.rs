//! Period normalization: timestamps, `MM/YYYY`, `YYYY-MM` and Portuguese
//! month-name codes all collapse onto one `YYYY-MM` key.

use crate::types::Scalar;
use crate::util::strip_accents;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const MONTH_NAMES: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

// Leading calendar date of a timestamp whose time part is in any format.
static ISO_DATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})(?:$|[T\s])").expect("invalid iso date regex")
});
static DAY_FIRST_DATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[-/](\d{1,2})[-/](\d{4})(?:$|[T\s])").expect("invalid day-first date regex")
});
static MONTH_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{2,4})\b").expect("invalid month/year regex"));
static YEAR_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[/-](\d{1,2})\b").expect("invalid year-month regex"));
static MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,})\.?\s*[/\- ]\s*(\d{4}|\d{2})\b").expect("invalid month name regex")
});

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date<D: Datelike>(d: &D) -> Self {
        Self {
            year: d.year(),
            month: d.month(),
        }
    }

    /// Canonical `YYYY-MM` key.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Display form such as `setembro/2025`. Not part of the key.
    pub fn display_label(&self) -> String {
        format!("{}/{}", month_name(self.month), self.year)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.wrapping_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

/// Canonical label for a cell, or its trimmed text when it cannot be parsed.
/// Missing cells normalize to an empty string.
pub fn normalize(value: &Scalar) -> String {
    match value {
        Scalar::Date(dt) => Period::from_date(dt).label(),
        Scalar::Missing => String::new(),
        other => {
            let text = other.as_text().unwrap_or_default();
            normalize_text(&text)
        }
    }
}

/// Text entry point of [`normalize`]; also used for user-typed filters.
pub fn normalize_text(raw: &str) -> String {
    let raw = raw.trim();
    match parse_period(raw) {
        Some(p) => p.label(),
        None => {
            if !raw.is_empty() {
                warn!("period '{}' could not be normalized; kept verbatim", raw);
            }
            raw.to_string()
        }
    }
}

pub fn parse_period(raw: &str) -> Option<Period> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(p) = parse_timestamp(raw) {
        return Some(p);
    }
    // A full date never falls through to the month/year patterns.
    if ISO_DATE_PREFIX.is_match(raw) || DAY_FIRST_DATE_PREFIX.is_match(raw) {
        return parse_date_prefix(raw);
    }
    parse_month_first(raw)
        .or_else(|| parse_year_first(raw))
        .or_else(|| parse_month_name(raw))
}

fn parse_timestamp(raw: &str) -> Option<Period> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .map(|dt| Period::from_date(&dt))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .map(|d| Period::from_date(&d))
        })
}

/// `2025-09-30 08:15`, `30/09/2025 08:15:00.123`: only the date part is read,
/// so a `MM-DD` pair inside a full date is never taken for `MM/YY`.
fn parse_date_prefix(raw: &str) -> Option<Period> {
    if let Some(caps) = ISO_DATE_PREFIX.captures(raw) {
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let day: u32 = caps.get(3)?.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| Period::from_date(&d));
    }
    let caps = DAY_FIRST_DATE_PREFIX.captures(raw)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| Period::from_date(&d))
}

/// `MM/YYYY` or `MM/YY`; a two-digit year gets the `20` century.
fn parse_month_first(raw: &str) -> Option<Period> {
    let caps = MONTH_FIRST.captures(raw)?;
    let month: u32 = caps.get(1)?.as_str().parse().ok()?;
    let year = expand_year(caps.get(2)?.as_str())?;
    Period::new(year, month)
}

fn parse_year_first(raw: &str) -> Option<Period> {
    let caps = YEAR_FIRST.captures(raw)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    Period::new(year, month)
}

/// `setembro/25`, `Set-2025`, `março 2024`.
fn parse_month_name(raw: &str) -> Option<Period> {
    let folded = strip_accents(raw).to_lowercase();
    let caps = MONTH_NAME.captures(&folded)?;
    let word = caps.get(1)?.as_str();
    let month = MONTH_NAMES.iter().position(|name| {
        let name = strip_accents(name);
        name == word || (word.len() == 3 && name.starts_with(word))
    })?;
    let year = expand_year(caps.get(2)?.as_str())?;
    Period::new(year, month as u32 + 1)
}

fn expand_year(digits: &str) -> Option<i32> {
    match digits.len() {
        4 => digits.parse().ok(),
        2 => format!("20{}", digits).parse().ok(),
        _ => None,
    }
}
