#![no_main]

//! Fuzz target for clock time and duration parsing.
//!
//! Input comes straight from the command line, so the parsers must reject
//! anything malformed without panicking, including multi-byte characters
//! and numbers large enough to overflow.

use arbitrary::Arbitrary;
use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;

use jiralog::timeparse::{
    format_duration, parse_api_timestamp, parse_clock_time, parse_duration_to_seconds, ClockTime,
};

#[derive(Arbitrary, Debug)]
struct TimeInput {
    clock: String,
    duration: String,
    timestamp: String,
}

fuzz_target!(|input: TimeInput| {
    if let Ok(time) = ClockTime::parse(&input.clock) {
        assert!(time.hour < 24 && time.minute < 60 && time.second < 60);
    }
    if let Some(date) = NaiveDate::from_ymd_opt(2024, 6, 12) {
        let _ = parse_clock_time(&input.clock, date);
    }

    if let Ok(seconds) = parse_duration_to_seconds(&input.duration) {
        assert!(seconds >= 0);
        let _ = format_duration(seconds);
    }

    let _ = parse_api_timestamp(&input.timestamp);
});
