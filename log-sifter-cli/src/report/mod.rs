//! Report generation
//!
//! Renders a `SiftReport` as terminal text or a JSON file.

pub mod json;
pub mod txt;

use chrono::Duration;
use clap::ValueEnum;

/// Amount of detail in the text report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Verbosity {
    /// One block per symptom tag
    #[value(alias = "0")]
    Low,
    /// One block per burst
    #[default]
    #[value(alias = "1")]
    Medium,
    /// Bursts with their symptoms and statistics
    #[value(alias = "2")]
    High,
}

/// Format a duration as `H:MM:SS.ffffff`
pub fn format_duration(duration: &Duration) -> String {
    let sign = if *duration < Duration::zero() { "-" } else { "" };
    let duration = duration.abs();
    let micros = duration.num_microseconds().unwrap_or(i64::MAX);
    let total_secs = micros / 1_000_000;
    format!(
        "{}{}:{:02}:{:02}.{:06}",
        sign,
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        micros % 1_000_000
    )
}
