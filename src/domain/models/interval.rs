//! Rotation interval classes and the path placeholders they imply.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::errors::ConfigError;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 60 * MINUTE_SECS;
const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Granularity of one rotation bucket.
///
/// The nominal durations of `Month` and `Year` are 30 and 365 days. Files
/// produced by earlier deployments were bucketed that way, so the numbers
/// must not be replaced with calendar-exact arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalClass {
    /// One file per minute
    Minute,
    /// One file per hour
    Hour,
    /// One file per day
    Day,
    /// Nominal 30-day buckets named by year and month
    Month,
    /// Nominal 365-day buckets named by year
    Year,
}

impl IntervalClass {
    /// All classes, finest first.
    pub const ALL: [Self; 5] = [Self::Minute, Self::Hour, Self::Day, Self::Month, Self::Year];

    /// Lowercase name, as accepted by the parser.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Nominal span of one bucket in seconds.
    pub const fn seconds(&self) -> i64 {
        match self {
            Self::Minute => MINUTE_SECS,
            Self::Hour => HOUR_SECS,
            Self::Day => DAY_SECS,
            Self::Month => 30 * DAY_SECS,
            Self::Year => 365 * DAY_SECS,
        }
    }

    /// Nominal span of one bucket.
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds())
    }

    /// Placeholders rendered into file names for this class, coarsest first.
    pub fn placeholders(&self) -> &'static [Placeholder] {
        static ORDER: [Placeholder; 5] = [
            Placeholder::Year,
            Placeholder::Month,
            Placeholder::Day,
            Placeholder::Hour,
            Placeholder::Minute,
        ];
        let depth = match self {
            Self::Year => 1,
            Self::Month => 2,
            Self::Day => 3,
            Self::Hour => 4,
            Self::Minute => 5,
        };
        &ORDER[..depth]
    }
}

impl fmt::Display for IntervalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(ConfigError::InvalidInterval(s.to_string())),
        }
    }
}

/// One date/time component of a rotated file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Four-digit year
    Year,
    /// Two-digit month
    Month,
    /// Two-digit day of month
    Day,
    /// Two-digit hour
    Hour,
    /// Two-digit minute
    Minute,
}

impl Placeholder {
    /// strftime-style token used in path templates.
    pub const fn token(&self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::Month => "%m",
            Self::Day => "%d",
            Self::Hour => "%H",
            Self::Minute => "%M",
        }
    }

    /// Number of digits the component occupies in a file name.
    pub const fn width(&self) -> usize {
        match self {
            Self::Year => 4,
            _ => 2,
        }
    }

    /// Zero-padded component of `at`.
    pub fn render(&self, at: &NaiveDateTime) -> String {
        match self {
            Self::Year => format!("{:04}", at.year()),
            Self::Month => format!("{:02}", at.month()),
            Self::Day => format!("{:02}", at.day()),
            Self::Hour => format!("{:02}", at.hour()),
            Self::Minute => format!("{:02}", at.minute()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_durations() {
        assert_eq!(IntervalClass::Minute.duration(), Duration::minutes(1));
        assert_eq!(IntervalClass::Hour.duration(), Duration::hours(1));
        assert_eq!(IntervalClass::Day.duration(), Duration::hours(24));
        assert_eq!(IntervalClass::Month.duration(), Duration::hours(30 * 24));
        assert_eq!(IntervalClass::Year.duration(), Duration::hours(365 * 24));
    }

    #[test]
    fn test_placeholder_depth() {
        assert_eq!(IntervalClass::Year.placeholders(), &[Placeholder::Year]);
        assert_eq!(
            IntervalClass::Day.placeholders(),
            &[Placeholder::Year, Placeholder::Month, Placeholder::Day]
        );
        assert_eq!(IntervalClass::Minute.placeholders().len(), 5);
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!("Day".parse::<IntervalClass>().unwrap(), IntervalClass::Day);
        assert_eq!(" hour ".parse::<IntervalClass>().unwrap(), IntervalClass::Hour);

        match "fortnight".parse::<IntervalClass>() {
            Err(ConfigError::InvalidInterval(s)) => assert_eq!(s, "fortnight"),
            other => panic!("Expected InvalidInterval, got {other:?}"),
        }
    }

    #[test]
    fn test_render_pads_components() {
        let at = NaiveDateTime::parse_from_str("2024-03-05 07:09:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let rendered: Vec<String> = IntervalClass::Minute
            .placeholders()
            .iter()
            .map(|p| p.render(&at))
            .collect();
        assert_eq!(rendered, vec!["2024", "03", "05", "07", "09"]);
    }
}
