//! Raw log tokenization
//!
//! Turns glog-style system log lines into tagged events:
//!
//! ```text
//! Log file created at: 2024/03/01 08:00:00
//! I0301 08:00:01.000000  1234 platform.cc:88] launching scheduled platform rebuild
//! ```
//!
//! The header supplies the year missing from each line's `MMDD` date. Every
//! line is tested against every event rule; each match yields one event.
//! Lines matching no rule produce nothing.

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use log_sifter::{Event, Timestamp};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const HEADER_PATTERN: &str =
    r"^Log file created at:\s*(?P<year>\d{4})/(?P<month>\d{2})/(?P<day>\d{2})\s*(?P<time>.*)$";

const LINE_PATTERN: &str = concat!(
    r"^(?P<message_type>[IWEF])(?P<date>\d{4})\s*",
    r"(?P<timestamp>\d{2}:\d{2}:\d{2}\.\d{6})\s*",
    r"(?P<thread_id>\d*)\s*",
    r"(?P<source_file>[\w\-]*\.\w*):(?P<source_file_line_number>\d*)\]\s*",
    r"(?P<message>.*)$"
);

/// Line details copied into every event's captured fields
const LINE_FIELDS: [&str; 5] = [
    "message_type",
    "thread_id",
    "source_file",
    "source_file_line_number",
    "message",
];

/// Severity letter leading every log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum MessageType {
    #[serde(rename = "I", alias = "info")]
    Info,
    #[serde(rename = "W", alias = "warning")]
    Warning,
    #[serde(rename = "E", alias = "error")]
    Error,
    #[serde(rename = "F", alias = "failure")]
    Failure,
}

impl MessageType {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "I" => Some(Self::Info),
            "W" => Some(Self::Warning),
            "E" => Some(Self::Error),
            "F" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Classifies log lines into one kind of event
#[derive(Debug, Clone)]
pub struct EventRule {
    pub tag: String,
    /// Anchored at the start of the line
    pub regex: Regex,
    pub message_type: Option<MessageType>,
}

impl EventRule {
    /// Compile `pattern` so that it only matches from the start of a line
    pub fn new(
        tag: impl Into<String>,
        pattern: &str,
        message_type: Option<MessageType>,
    ) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            tag: tag.into(),
            regex: Regex::new(&format!("^(?:{})", pattern))?,
            message_type,
        })
    }

    fn applies_to(&self, line_type: Option<MessageType>) -> bool {
        match self.message_type {
            Some(required) => line_type == Some(required),
            None => true,
        }
    }
}

/// Applies event rules to raw log text
pub struct LogTokenizer {
    rules: Vec<EventRule>,
    header: Regex,
    line: Regex,
}

impl LogTokenizer {
    pub fn new(rules: Vec<EventRule>) -> Result<Self> {
        Ok(Self {
            rules,
            header: Regex::new(HEADER_PATTERN).context("Invalid header pattern")?,
            line: Regex::new(LINE_PATTERN).context("Invalid line pattern")?,
        })
    }

    /// Read and tokenize a log file
    pub fn tokenize_file(&self, path: &Path) -> Result<Vec<Event>> {
        log::info!("Reading log file: {:?}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read log file: {:?}", path))?;
        self.tokenize(&content)
            .with_context(|| format!("Failed to tokenize log file: {:?}", path))
    }

    /// Tokenize complete log text, header line first
    pub fn tokenize(&self, content: &str) -> Result<Vec<Event>> {
        let mut lines = content.lines();
        let Some(first) = lines.next() else {
            return Ok(Vec::new());
        };
        let year = self.creation_year(first)?;

        let mut events = Vec::new();
        for (index, line) in lines.enumerate() {
            let line_number = index + 2;
            for rule in &self.rules {
                if let Some(event) = self.apply_rule(rule, line, year, line_number) {
                    events.push(event);
                }
            }
        }

        log::info!("Recognized {} events", events.len());
        Ok(events)
    }

    fn creation_year(&self, header: &str) -> Result<i32> {
        let caps = self
            .header
            .captures(header)
            .ok_or_else(|| anyhow!("Missing 'Log file created at:' header"))?;
        caps["year"]
            .parse()
            .with_context(|| format!("Invalid year in header: {}", header))
    }

    fn apply_rule(
        &self,
        rule: &EventRule,
        line: &str,
        year: i32,
        line_number: usize,
    ) -> Option<Event> {
        let line_type = line.get(..1).and_then(MessageType::from_prefix);
        if !rule.applies_to(line_type) {
            return None;
        }

        let matched = rule.regex.captures(line)?;

        let Some(details) = self.line.captures(line) else {
            log::warn!(
                "Line {} matched '{}' but is not a log line, skipping",
                line_number,
                rule.tag
            );
            return None;
        };

        let Some(timestamp) = parse_timestamp(year, &details) else {
            log::warn!("Line {} has an invalid timestamp, skipping", line_number);
            return None;
        };

        let mut event = Event::new(rule.tag.clone(), timestamp);
        for name in LINE_FIELDS {
            if let Some(value) = details.name(name) {
                event = event.with_field(name, value.as_str());
            }
        }
        for name in rule.regex.capture_names().flatten() {
            if let Some(value) = matched.name(name) {
                event = event.with_field(name, value.as_str());
            }
        }

        log::trace!("Line {}: '{}' at {}", line_number, rule.tag, timestamp);
        Some(event)
    }
}

/// Combine the header year with the line's `MMDD` date and time of day
fn parse_timestamp(year: i32, details: &Captures<'_>) -> Option<Timestamp> {
    let date = details.name("date")?.as_str();
    let month: u32 = date.get(..2)?.parse().ok()?;
    let day: u32 = date.get(2..)?.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::parse_from_str(details.name("timestamp")?.as_str(), "%H:%M:%S%.f").ok()?;
    Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}
