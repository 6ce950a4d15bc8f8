//! Training session tags
//!
//! A session tag identifies one class meeting as `"<week>-<session>"`, for
//! example `"3-1"`. Weeks run 1 through 22 with up to three sessions each.
//! The scan pipeline treats the tag as opaque text; validation only happens
//! where a tag enters the system (CLI arguments, TOML config).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Highest week number in a course
pub const MAX_WEEK: u8 = 22;

/// Highest session number within a week
pub const MAX_SESSION: u8 = 3;

/// One `week-session` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionTag {
    week: u8,
    session: u8,
}

impl SessionTag {
    /// Create a tag, validating both ranges
    pub fn new(week: u8, session: u8) -> Result<Self, Error> {
        if !(1..=MAX_WEEK).contains(&week) {
            return Err(Error::InvalidInput(format!(
                "week {} out of range 1-{}",
                week, MAX_WEEK
            )));
        }
        if !(1..=MAX_SESSION).contains(&session) {
            return Err(Error::InvalidInput(format!(
                "session {} out of range 1-{}",
                session, MAX_SESSION
            )));
        }
        Ok(Self { week, session })
    }

    pub fn week(&self) -> u8 {
        self.week
    }

    pub fn session(&self) -> u8 {
        self.session
    }

    /// Every valid tag in course order (`1-1`, `1-2`, `1-3`, `2-1`, ...)
    pub fn all() -> impl Iterator<Item = SessionTag> {
        (1..=MAX_WEEK).flat_map(|week| (1..=MAX_SESSION).map(move |session| SessionTag { week, session }))
    }

    /// Display label used by the session picker
    pub fn label(&self) -> String {
        format!("{}-{}회차", self.week, self.session)
    }
}

impl Default for SessionTag {
    fn default() -> Self {
        Self { week: 1, session: 1 }
    }
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.week, self.session)
    }
}

impl FromStr for SessionTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (week, session) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| Error::InvalidInput(format!("session tag '{}' is not <week>-<session>", s)))?;

        let week: u8 = week
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid week in session tag '{}'", s)))?;
        let session: u8 = session
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid session in session tag '{}'", s)))?;

        Self::new(week, session)
    }
}

impl TryFrom<String> for SessionTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionTag> for String {
    fn from(tag: SessionTag) -> Self {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let tag: SessionTag = "3-1".parse().unwrap();
        assert_eq!(tag.week(), 3);
        assert_eq!(tag.session(), 1);
        assert_eq!(tag.to_string(), "3-1");
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!("0-1".parse::<SessionTag>().is_err());
        assert!("23-1".parse::<SessionTag>().is_err());
        assert!("5-4".parse::<SessionTag>().is_err());
        assert!("5".parse::<SessionTag>().is_err());
        assert!("a-b".parse::<SessionTag>().is_err());
    }

    #[test]
    fn test_all_enumerates_course_order() {
        let tags: Vec<String> = SessionTag::all().map(|t| t.to_string()).collect();
        assert_eq!(tags.len(), 66);
        assert_eq!(tags[0], "1-1");
        assert_eq!(tags[3], "2-1");
        assert_eq!(tags.last().map(String::as_str), Some("22-3"));
    }

    #[test]
    fn test_label() {
        assert_eq!(SessionTag::new(12, 2).unwrap().label(), "12-2회차");
    }

    #[test]
    fn test_serde_as_string() {
        let tag = SessionTag::new(7, 3).unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"7-3\"");

        let back: SessionTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
        assert!(serde_json::from_str::<SessionTag>("\"9-9\"").is_err());
    }
}
