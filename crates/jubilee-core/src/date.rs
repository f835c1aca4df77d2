//! Birthdate value type.
//!
//! Dates are entered and stored as `DD.MM.YYYY` text, matching the on-disk
//! store format. Announcement matching compares month+day only.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Wire/store format for birthdates.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Oldest plausible age, in years. Anything older is rejected as a typo.
pub const MAX_AGE_YEARS: i64 = 150;

/// A calendar birthdate without a time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BirthDate(NaiveDate);

impl BirthDate {
    /// Parse `DD.MM.YYYY` input. Format/calendar errors only — use
    /// [`BirthDate::parse_checked`] for full registration validation.
    pub fn parse(input: &str) -> Result<Self> {
        NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|_| Error::validation(format!("'{input}' is not a valid DD.MM.YYYY date")))
    }

    /// Full registration validation: parse, then reject dates strictly in
    /// the future or implying an age over [`MAX_AGE_YEARS`].
    pub fn parse_checked(input: &str, today: NaiveDate) -> Result<Self> {
        let date = Self::parse(input)?;
        if date.0 > today {
            return Err(Error::validation("a birthdate cannot be in the future"));
        }
        if (today - date.0).num_days() > MAX_AGE_YEARS * 365 {
            return Err(Error::validation("that date is too far in the past"));
        }
        Ok(date)
    }

    /// Month+day key used for announcement matching.
    pub fn month_day(&self) -> MonthDay {
        MonthDay::of(self.0)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Month number (1-12), for grouping the list output.
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Day of month (1-31), for chronological sorting within a month.
    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl std::fmt::Display for BirthDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl std::str::FromStr for BirthDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for BirthDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BirthDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// A month+day pair, year ignored. What the daily jobs match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthDay {
    pub day: u32,
    pub month: u32,
}

impl MonthDay {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            day: date.day(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for MonthDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}.{:02}", self.day, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn test_parse_valid() {
        let bd = BirthDate::parse("25.12.1990").expect("should parse");
        assert_eq!(bd.to_string(), "25.12.1990");
        assert_eq!(bd.month_day(), MonthDay { day: 25, month: 12 });
    }

    #[test]
    fn test_parse_rejects_invalid_calendar_date() {
        assert!(BirthDate::parse("31.02.2020").is_err());
        assert!(BirthDate::parse("not a date").is_err());
        assert!(BirthDate::parse("1990-12-25").is_err());
    }

    #[test]
    fn test_checked_rejects_future() {
        let today = date(2026, 8, 27);
        // Tomorrow relative to "today" must be rejected.
        assert!(BirthDate::parse_checked("28.08.2026", today).is_err());
        // Today itself is allowed (not strictly in the future).
        assert!(BirthDate::parse_checked("27.08.2026", today).is_ok());
    }

    #[test]
    fn test_checked_rejects_implausible_age() {
        let today = date(2026, 8, 27);
        assert!(BirthDate::parse_checked("01.01.1850", today).is_err());
        assert!(BirthDate::parse_checked("01.01.1950", today).is_ok());
    }

    #[test]
    fn test_serde_string_roundtrip() {
        let bd = BirthDate::parse("07.03.1985").expect("should parse");
        let json = serde_json::to_string(&bd).expect("serialize");
        assert_eq!(json, "\"07.03.1985\"");
        let back: BirthDate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, bd);
    }

    #[test]
    fn test_month_day_display() {
        let md = MonthDay { day: 1, month: 9 };
        assert_eq!(md.to_string(), "01.09");
    }
}
