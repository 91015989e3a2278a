//! Clock annotation matching for move comments.
//!
//! Lichess-style comments embed the remaining time as `[%clk H:MM:SS]`, usually next to
//! other commands such as `[%eval 0.25]`. A [`ClockPattern`] locates the first marker and
//! splits the comment into five named parts:
//!
//! - `prefix`: everything before the marker
//! - `hours`, `minutes`, `seconds`: the digit runs inside the marker
//! - `suffix`: everything after the marker
//!
//! The group names are the contract with every consumer (table columns, JSON keys), so a
//! pattern is only accepted when it declares exactly these five groups.

use regex::{Regex, RegexBuilder};
use std::error::Error;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

/// Matches the first `[%clk H:MM:SS]` marker, with optional fractional seconds.
pub const DEFAULT_CLOCK_PATTERN: &str = r"(?s)^(?P<prefix>.*?)\[%clk\s+(?P<hours>\d+):(?P<minutes>\d+):(?P<seconds>\d+(?:\.\d*)?)\](?P<suffix>.*)$";

// Upper bound on the compiled program, not on the input length.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

static DEFAULT_PATTERN: LazyLock<ClockPattern> = LazyLock::new(|| {
    ClockPattern::new(DEFAULT_CLOCK_PATTERN).expect("valid default clock pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockField {
    Prefix,
    Hours,
    Minutes,
    Seconds,
    Suffix,
}

impl ClockField {
    pub const ALL: [ClockField; 5] = [
        ClockField::Prefix,
        ClockField::Hours,
        ClockField::Minutes,
        ClockField::Seconds,
        ClockField::Suffix,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClockField::Prefix => "prefix",
            ClockField::Hours => "hours",
            ClockField::Minutes => "minutes",
            ClockField::Seconds => "seconds",
            ClockField::Suffix => "suffix",
        }
    }
}

impl fmt::Display for ClockField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five captured parts of a comment that contains a clock marker.
///
/// Fields hold the raw captured text; no range validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedClock {
    pub prefix: String,
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
    pub suffix: String,
    marker: Range<usize>,
}

impl ParsedClock {
    pub fn field(&self, field: ClockField) -> &str {
        match field {
            ClockField::Prefix => &self.prefix,
            ClockField::Hours => &self.hours,
            ClockField::Minutes => &self.minutes,
            ClockField::Seconds => &self.seconds,
            ClockField::Suffix => &self.suffix,
        }
    }

    /// Remaining time in seconds.
    ///
    /// Returns `None` when minutes or seconds fall outside `0..60` or a field is not numeric.
    pub fn total_seconds(&self) -> Option<f64> {
        let hours = self.hours.parse::<u32>().ok()?;
        let minutes = self.minutes.parse::<u32>().ok()?;
        let seconds = self.seconds.parse::<f64>().ok()?;

        if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
            return None;
        }

        Some(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
    }

    /// The marker text of `comment` that sits between `prefix` and `suffix`.
    ///
    /// `comment` must be the string this clock was parsed from. The span comes from the match
    /// positions, so unanchored patterns whose `prefix` and `suffix` cover only part of the
    /// surrounding text still locate the marker.
    pub fn marker_in<'a>(&self, comment: &'a str) -> Option<&'a str> {
        comment.get(self.marker.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockPatternError {
    Invalid(String),
    MissingGroup(&'static str),
    UnexpectedGroup(String),
}

impl fmt::Display for ClockPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockPatternError::Invalid(msg) => write!(f, "invalid clock pattern: {msg}"),
            ClockPatternError::MissingGroup(name) => {
                write!(f, "clock pattern is missing capture group '{name}'")
            }
            ClockPatternError::UnexpectedGroup(name) => {
                write!(f, "clock pattern declares unexpected capture group '{name}'")
            }
        }
    }
}

impl Error for ClockPatternError {}

/// A compiled clock-annotation pattern with the five required capture groups.
#[derive(Debug, Clone)]
pub struct ClockPattern {
    regex: Regex,
}

impl ClockPattern {
    pub fn new(pattern: &str) -> Result<Self, ClockPatternError> {
        let regex = RegexBuilder::new(pattern)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| ClockPatternError::Invalid(e.to_string()))?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();

        if let Some(unexpected) = names
            .iter()
            .find(|name| !ClockField::ALL.iter().any(|f| f.as_str() == **name))
        {
            return Err(ClockPatternError::UnexpectedGroup(unexpected.to_string()));
        }

        for field in ClockField::ALL {
            if !names.contains(&field.as_str()) {
                return Err(ClockPatternError::MissingGroup(field.as_str()));
            }
        }

        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Split `comment` around its clock marker; `None` when there is no marker.
    ///
    /// A group that does not participate in a successful match is reported as `""`, so a
    /// result always carries all five fields.
    pub fn parse(&self, comment: &str) -> Option<ParsedClock> {
        let caps = self.regex.captures(comment)?;
        let group = |field: ClockField| {
            caps.name(field.as_str())
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        let whole = caps.get(0)?;
        let start = caps
            .name(ClockField::Prefix.as_str())
            .map_or(whole.start(), |m| m.end());
        let end = caps
            .name(ClockField::Suffix.as_str())
            .map_or(whole.end(), |m| m.start());

        Some(ParsedClock {
            prefix: group(ClockField::Prefix),
            hours: group(ClockField::Hours),
            minutes: group(ClockField::Minutes),
            seconds: group(ClockField::Seconds),
            suffix: group(ClockField::Suffix),
            marker: start..end,
        })
    }
}

impl Default for ClockPattern {
    fn default() -> Self {
        DEFAULT_PATTERN.clone()
    }
}

pub fn default_pattern() -> &'static ClockPattern {
    &DEFAULT_PATTERN
}

/// Parse with [`DEFAULT_CLOCK_PATTERN`].
pub fn parse_clock(comment: &str) -> Option<ParsedClock> {
    DEFAULT_PATTERN.parse(comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_with_surrounding_text() {
        let parsed = parse_clock("something [%clk 0:05:23] more text").unwrap();
        assert_eq!(parsed.prefix, "something ");
        assert_eq!(parsed.hours, "0");
        assert_eq!(parsed.minutes, "05");
        assert_eq!(parsed.seconds, "23");
        assert_eq!(parsed.suffix, " more text");
    }

    #[test]
    fn test_parse_clock_no_marker() {
        assert_eq!(parse_clock("no clock here"), None);
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("[%eval 0.25]"), None);
        assert_eq!(parse_clock("[%clk 1:30]"), None);
    }

    #[test]
    fn test_parse_clock_round_trip() {
        let comments = [
            "[%clk 1:30:43]",
            " [%eval 0.25] [%clk 1:30:43] ",
            "prefix\nwith newline [%clk 0:00:09] and\nsuffix",
            "[%clk 0:00:01.5] tail",
        ];

        for comment in comments {
            let parsed = parse_clock(comment).unwrap();
            let marker = parsed.marker_in(comment).unwrap();
            assert!(marker.starts_with("[%clk"));
            assert!(marker.ends_with(']'));
            assert_eq!(
                format!("{}{}{}", parsed.prefix, marker, parsed.suffix),
                comment
            );
        }
    }

    #[test]
    fn test_parse_clock_first_marker_wins() {
        let parsed = parse_clock("[%clk 0:01:00] [%clk 0:02:00]").unwrap();
        assert_eq!(parsed.minutes, "01");
        assert_eq!(parsed.suffix, " [%clk 0:02:00]");
    }

    #[test]
    fn test_parse_clock_lichess_comment() {
        let parsed = parse_clock(" [%eval 0.22] [%clk 1:30:42] ").unwrap();
        assert_eq!(parsed.prefix, " [%eval 0.22] ");
        assert_eq!(parsed.hours, "1");
        assert_eq!(parsed.minutes, "30");
        assert_eq!(parsed.seconds, "42");
        assert_eq!(parsed.suffix, " ");
    }

    #[test]
    fn test_parse_clock_is_deterministic() {
        let comment = "x [%clk 2:00:00] y";
        assert_eq!(parse_clock(comment), parse_clock(comment));
    }

    #[test]
    fn test_parse_clock_long_comment() {
        let mut comment = "a".repeat(200_000);
        comment.push_str("[%clk");
        assert_eq!(parse_clock(&comment), None);

        comment.push_str(" 0:10:00]");
        let parsed = parse_clock(&comment).unwrap();
        assert_eq!(parsed.prefix.len(), 200_000);
        assert_eq!(parsed.minutes, "10");
    }

    #[test]
    fn test_total_seconds() {
        let parsed = parse_clock("[%clk 1:02:03]").unwrap();
        assert_eq!(parsed.total_seconds(), Some(3723.0));

        let fractional = parse_clock("[%clk 0:00:09.5]").unwrap();
        assert_eq!(fractional.total_seconds(), Some(9.5));
    }

    #[test]
    fn test_out_of_range_fields_pass_through_raw() {
        let parsed = parse_clock("[%clk 0:75:99]").unwrap();
        assert_eq!(parsed.minutes, "75");
        assert_eq!(parsed.seconds, "99");
        assert_eq!(parsed.total_seconds(), None);
    }

    #[test]
    fn test_field_accessor_matches_struct() {
        let parsed = parse_clock("a [%clk 3:04:05] b").unwrap();
        let values: Vec<&str> = ClockField::ALL.iter().map(|f| parsed.field(*f)).collect();
        assert_eq!(values, vec!["a ", "3", "04", "05", " b"]);
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = ClockPattern::new(
            r"^(?P<prefix>.*?)\{clock (?P<hours>\d+)h(?P<minutes>\d+)m(?P<seconds>\d+)s\}(?P<suffix>.*)$",
        )
        .unwrap();

        let parsed = pattern.parse("move {clock 1h02m03s}!").unwrap();
        assert_eq!(parsed.hours, "1");
        assert_eq!(parsed.minutes, "02");
        assert_eq!(parsed.seconds, "03");
        assert_eq!(parsed.suffix, "!");
        assert_eq!(pattern.parse("[%clk 0:05:23]"), None);
    }

    #[test]
    fn test_unanchored_pattern_marker_from_match_positions() {
        let pattern = ClockPattern::new(
            r"(?P<prefix>\s?)\[%clk\s(?P<hours>\d+):(?P<minutes>\d+):(?P<seconds>\d+(?:\.\d*)?)\](?P<suffix>\s?)",
        )
        .unwrap();

        let comment = "something [%clk 0:05:23] more text";
        let parsed = pattern.parse(comment).unwrap();
        assert_eq!(parsed.prefix, " ");
        assert_eq!(parsed.suffix, " ");
        assert_eq!(parsed.minutes, "05");
        assert_eq!(parsed.marker_in(comment), Some("[%clk 0:05:23]"));
    }

    #[test]
    fn test_trailing_decimal_point_seconds() {
        let parsed = parse_clock("[%clk 0:00:05.]").unwrap();
        assert_eq!(parsed.seconds, "05.");
        assert_eq!(parsed.total_seconds(), Some(5.0));
        assert_eq!(parsed.marker_in("[%clk 0:00:05.]"), Some("[%clk 0:00:05.]"));
    }

    #[test]
    fn test_custom_pattern_optional_group_reports_empty() {
        let pattern = ClockPattern::new(
            r"^(?P<prefix>.*?)\[%clk (?:(?P<hours>\d+):)?(?P<minutes>\d+):(?P<seconds>\d+)\](?P<suffix>.*)$",
        )
        .unwrap();

        let parsed = pattern.parse("[%clk 05:23]").unwrap();
        assert_eq!(parsed.hours, "");
        assert_eq!(parsed.minutes, "05");
    }

    #[test]
    fn test_pattern_missing_group_rejected() {
        let err = ClockPattern::new(r"(?P<prefix>.*)(?P<hours>\d+)(?P<minutes>\d+)(?P<seconds>\d+)")
            .unwrap_err();
        assert_eq!(err, ClockPatternError::MissingGroup("suffix"));
    }

    #[test]
    fn test_pattern_unexpected_group_rejected() {
        let err = ClockPattern::new(
            r"(?P<prefix>.*)(?P<hours>\d+)(?P<minutes>\d+)(?P<seconds>\d+)(?P<millis>\d+)(?P<suffix>.*)",
        )
        .unwrap_err();
        assert_eq!(err, ClockPatternError::UnexpectedGroup("millis".to_string()));
    }

    #[test]
    fn test_pattern_invalid_regex_rejected() {
        let err = ClockPattern::new(r"(?P<prefix>.*").unwrap_err();
        assert!(matches!(err, ClockPatternError::Invalid(_)));
        assert!(err.to_string().starts_with("invalid clock pattern"));
    }

    #[test]
    fn test_default_pattern_round_trips_source() {
        assert_eq!(ClockPattern::default().as_str(), DEFAULT_CLOCK_PATTERN);
        assert_eq!(default_pattern().as_str(), DEFAULT_CLOCK_PATTERN);
    }
}
