//! Parsing of human-entered clock times and durations.
//!
//! Clock times look like `9`, `10:30`, `10.30.15`, `12 43`, `2 p.m.` or
//! `10:45am`. Durations are plain seconds (`90`), colon separated
//! (`1:30:00`) or unit tokens (`1h 30m`, `45s`).

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// Wire format Jira expects for `started` fields.
const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f+0000";
const API_TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty time input")]
    Empty,

    #[error("'{0}' does not start with an hour")]
    MissingHour(String),

    #[error("'{input}': {reason}")]
    OutOfRange { input: String, reason: &'static str },

    #[error("Unexpected '{rest}' in '{input}'")]
    Trailing { input: String, rest: String },

    #[error("'{0}' is not a valid duration (try 90, 1:30 or 1h 30m)")]
    InvalidDuration(String),

    #[error("Duration '{0}' is negative")]
    Negative(String),

    #[error("{0} does not exist in the local time zone")]
    NonexistentLocalTime(String),

    #[error("'{0}' is not a valid API timestamp")]
    InvalidTimestamp(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// A wall-clock time of day after meridiem adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl ClockTime {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut s = Scanner::new(trimmed);
        let hour = s
            .digits(2)
            .ok_or_else(|| ParseError::MissingHour(trimmed.to_string()))?;
        s.eat(is_separator);
        let minute = s.digits(2).unwrap_or(0);
        s.eat(is_separator);
        let second = s.digits(2).unwrap_or(0);
        s.eat(is_separator);
        s.skip_spaces();
        let meridiem = s.meridiem();
        s.skip_spaces();

        if !s.rest().is_empty() {
            return Err(ParseError::Trailing {
                input: trimmed.to_string(),
                rest: s.rest().to_string(),
            });
        }

        let out_of_range = |reason| ParseError::OutOfRange {
            input: trimmed.to_string(),
            reason,
        };

        let hour = match meridiem {
            Some(m) => {
                if !(1..=12).contains(&hour) {
                    return Err(out_of_range("hour must be 1-12 with am/pm"));
                }
                match m {
                    Meridiem::Pm if hour < 12 => hour + 12,
                    Meridiem::Am if hour == 12 => 0,
                    _ => hour,
                }
            }
            None => {
                if hour > 23 {
                    return Err(out_of_range("hour must be 0-23"));
                }
                hour
            }
        };
        if minute > 59 {
            return Err(out_of_range("minute must be 0-59"));
        }
        if second > 59 {
            return Err(out_of_range("second must be 0-59"));
        }

        Ok(ClockTime {
            hour,
            minute,
            second,
        })
    }

    /// Places this time on `date` in the local time zone.
    ///
    /// Ambiguous local times (DST fold) resolve to the earlier instant.
    pub fn on(self, date: NaiveDate) -> Result<DateTime<Local>, ParseError> {
        let naive = NaiveTime::from_hms_opt(self.hour, self.minute, self.second)
            .map(|t| date.and_time(t))
            .ok_or_else(|| ParseError::NonexistentLocalTime(self.to_string()))?;
        naive
            .and_local_timezone(Local)
            .earliest()
            .ok_or_else(|| ParseError::NonexistentLocalTime(naive.to_string()))
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Parses a clock time and places it on `reference`, milliseconds zeroed.
///
/// `12 a.m.` is midnight and `12 p.m.` is noon.
pub fn parse_clock_time(input: &str, reference: NaiveDate) -> Result<DateTime<Local>, ParseError> {
    ClockTime::parse(input)?.on(reference)
}

/// Parses a duration into whole seconds.
pub fn parse_duration_to_seconds(input: &str) -> Result<i64, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(seconds) = bare_seconds(trimmed)? {
        return Ok(seconds);
    }

    if trimmed.contains(':') {
        colon_seconds(trimmed)
    } else {
        unit_seconds(trimmed)
    }
}

/// Formats an instant the way Jira expects: UTC with an explicit `+0000`.
pub fn to_api_timestamp<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant
        .with_timezone(&Utc)
        .format(API_TIMESTAMP_FORMAT)
        .to_string()
}

pub fn parse_api_timestamp(input: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    DateTime::parse_from_str(input, API_TIMESTAMP_PARSE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(input))
        .map_err(|_| ParseError::InvalidTimestamp(input.to_string()))
}

/// Renders seconds as `1h 30m 5s`, omitting zero units.
pub fn format_duration(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);

    let mut parts = Vec::new();
    if h > 0 {
        parts.push(format!("{}h", h));
    }
    if m > 0 {
        parts.push(format!("{}m", m));
    }
    if s > 0 || parts.is_empty() {
        parts.push(format!("{}s", s));
    }
    format!("{}{}", sign, parts.join(" "))
}

/// `Ok(None)` when the input is not shaped like a plain number.
fn bare_seconds(input: &str) -> Result<Option<i64>, ParseError> {
    let unsigned = input.strip_prefix(&['+', '-'][..]).unwrap_or(input);
    let mut dots = 0;
    let mut digits = 0;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return Ok(None),
        }
    }
    if digits == 0 || dots > 1 {
        return Ok(None);
    }

    let value: f64 = input
        .parse()
        .map_err(|_| ParseError::InvalidDuration(input.to_string()))?;
    if value < 0.0 {
        return Err(ParseError::Negative(input.to_string()));
    }
    if value > i64::MAX as f64 {
        return Err(ParseError::InvalidDuration(input.to_string()));
    }
    Ok(Some(value.floor() as i64))
}

fn colon_seconds(input: &str) -> Result<i64, ParseError> {
    let invalid = || ParseError::InvalidDuration(input.to_string());

    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() > 3 || parts.iter().all(|p| p.is_empty()) {
        return Err(invalid());
    }

    let mut total: i64 = 0;
    for (part, weight) in parts.iter().zip([3600, 60, 1]) {
        let value = if part.is_empty() {
            0
        } else if part.bytes().all(|b| b.is_ascii_digit()) {
            part.parse::<i64>().map_err(|_| invalid())?
        } else {
            return Err(invalid());
        };
        total = value
            .checked_mul(weight)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
    }
    Ok(total)
}

fn unit_seconds(input: &str) -> Result<i64, ParseError> {
    const UNITS: [(u8, i64); 3] = [(b'h', 3600), (b'm', 60), (b's', 1)];
    let invalid = || ParseError::InvalidDuration(input.to_string());

    let mut s = Scanner::new(input);
    let mut total: i64 = 0;
    let mut next_unit = 0;
    loop {
        s.skip_spaces();
        if s.rest().is_empty() {
            break;
        }
        let value = s.number().ok_or_else(invalid)?;
        let unit = s.bump().ok_or_else(invalid)?.to_ascii_lowercase();
        let idx = UNITS
            .iter()
            .position(|(u, _)| *u == unit)
            .ok_or_else(invalid)?;
        // h, m and s must appear in that order, each at most once
        if idx < next_unit {
            return Err(invalid());
        }
        next_unit = idx + 1;
        total = value
            .checked_mul(UNITS[idx].1)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
    }

    if next_unit == 0 {
        return Err(invalid());
    }
    Ok(total)
}

fn is_separator(b: u8) -> bool {
    matches!(b, b':' | b'.' | b' ')
}

/// Byte cursor over ASCII input. Only ASCII bytes are ever consumed, so
/// `rest()` always slices on a char boundary.
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn eat(&mut self, pred: impl Fn(u8) -> bool) -> bool {
        match self.peek() {
            Some(b) if b.is_ascii() && pred(b) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn eat_ci(&mut self, expected: u8) -> bool {
        self.eat(|b| b.eq_ignore_ascii_case(&expected))
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek().filter(u8::is_ascii)?;
        self.pos += 1;
        Some(b)
    }

    fn skip_spaces(&mut self) {
        while self.eat(|b| b.is_ascii_whitespace()) {}
    }

    /// Up to `max` digits.
    fn digits(&mut self, max: usize) -> Option<u32> {
        let start = self.pos;
        while self.pos - start < max && self.eat(|b| b.is_ascii_digit()) {}
        self.input[start..self.pos].parse().ok()
    }

    /// Any run of digits that fits in an i64.
    fn number(&mut self) -> Option<i64> {
        let start = self.pos;
        while self.eat(|b| b.is_ascii_digit()) {}
        self.input[start..self.pos].parse().ok()
    }

    /// `am`, `a.m.`, `PM`, `p.m` and friends. Leaves the cursor untouched
    /// when no marker follows.
    fn meridiem(&mut self) -> Option<Meridiem> {
        let save = self.pos;
        let meridiem = if self.eat_ci(b'a') {
            Meridiem::Am
        } else if self.eat_ci(b'p') {
            Meridiem::Pm
        } else {
            return None;
        };
        self.eat(|b| b == b'.');
        if !self.eat_ci(b'm') {
            self.pos = save;
            return None;
        }
        self.eat(|b| b == b'.');
        Some(meridiem)
    }
}
