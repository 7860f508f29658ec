//! Due dates as entered on the task form.
//!
//! Dates are displayed and stored as `DD/MM/YYYY`. The HTML date input's
//! `YYYY-MM-DD` form is accepted on read so records written by either
//! front end decode. [`TaskDate::autocorrect`] turns half-typed input into
//! the nearest valid calendar date.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `chrono` format string used for display and storage.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// `chrono` format string of the HTML date input.
const ISO_FORMAT: &str = "%Y-%m-%d";

/// Errors produced when parsing a due date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    /// The input was empty or whitespace.
    #[error("date is empty")]
    Empty,
    /// The input matched neither accepted format.
    #[error("invalid date: {0:?} (expected DD/MM/YYYY)")]
    Invalid(String),
}

/// A task's due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskDate(NaiveDate);

impl TaskDate {
    /// Wraps an existing calendar date.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Builds a date from its parts, or `None` if it does not exist.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Returns the underlying calendar date.
    #[must_use]
    pub const fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Parses `DD/MM/YYYY` or `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::Empty`] for blank input and
    /// [`DateError::Invalid`] when neither format matches.
    pub fn parse(input: &str) -> Result<Self, DateError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DateError::Empty);
        }
        NaiveDate::parse_from_str(trimmed, DISPLAY_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(trimmed, ISO_FORMAT))
            .map(Self)
            .map_err(|_| DateError::Invalid(trimmed.to_string()))
    }

    /// Normalizes free-form typed input into a valid date.
    ///
    /// Separated input (`5/3/24`, `05.03.2024`, `2024-03-05`) is split into
    /// its groups; unseparated input is read as `DDMMYY` or `DDMMYYYY`.
    /// Two-digit years land in the 2000s, the month is clamped to `1..=12`
    /// and the day to the length of that month.
    ///
    /// Returns `None` until enough has been typed to name a day, a month,
    /// and a year.
    #[must_use]
    pub fn autocorrect(input: &str) -> Option<Self> {
        let (day, month, year) = split_parts(input.trim())?;
        let year = if year < 100 { 2000 + year } else { year };
        let year = i32::try_from(year).ok()?;
        let month = month.clamp(1, 12);
        let day = day.clamp(1, days_in_month(year, month)?);
        Self::from_ymd(year, month, day)
    }
}

/// Splits typed input into `(day, month, year)`.
fn split_parts(input: &str) -> Option<(u32, u32, u32)> {
    let is_separator = |c: char| matches!(c, '/' | '.' | '-' | ' ');
    if input.contains(is_separator) {
        let groups: Vec<&str> = input.split(is_separator).filter(|g| !g.is_empty()).collect();
        let [a, b, c] = groups.as_slice() else {
            return None;
        };
        let (a_n, b_n, c_n) = (number(a)?, number(b)?, number(c)?);
        // A leading four-digit group is the ISO year-first layout.
        return if a.len() == 4 {
            Some((c_n, b_n, a_n))
        } else {
            Some((a_n, b_n, c_n))
        };
    }

    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        6 | 8 => Some((
            number(&digits[0..2])?,
            number(&digits[2..4])?,
            number(&digits[4..])?,
        )),
        _ => None,
    }
}

fn number(group: &str) -> Option<u32> {
    if group.is_empty() || group.len() > 4 || !group.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    group.parse().ok()
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|d| d.day())
}

impl fmt::Display for TaskDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DISPLAY_FORMAT))
    }
}

impl FromStr for TaskDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TaskDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for an optional date stored as a possibly-empty string.
///
/// `None` is written as `""`; `null`, a missing field, and `""` all read
/// back as `None`.
pub mod optional {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TaskDate;

    /// Writes `None` as an empty string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        date: &Option<TaskDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.collect_str(d),
            None => serializer.serialize_str(""),
        }
    }

    /// Reads `null` and `""` as `None`.
    ///
    /// # Errors
    ///
    /// Fails when a non-empty string is not a valid date.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TaskDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => TaskDate::parse(s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}
