//! Statistics over a population of detected signals
//!
//! Summaries cover every detected signal of one tag, confirmed or not:
//! occurrences per hour of day, and the spread of durations and intervals.

use crate::types::{duration_secs, DetectedSignal};
use chrono::Timelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Mean, population standard deviation and extremes, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

impl Distribution {
    /// Summarize the samples, or `None` when there are none
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);

        Some(Self {
            mean,
            std: variance.sqrt(),
            max,
            min,
        })
    }
}

/// Statistics for one signal tag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub signal_tag: String,
    /// Occurrences divided by the span of hours-of-day they fall in
    pub hourly_rate: f64,
    /// Signal counts keyed by hour of day of their start
    pub hourly_counts: BTreeMap<u32, usize>,
    #[serde(rename = "durations_data_seconds")]
    pub durations: Distribution,
    /// Absent when no signal carried an interval
    #[serde(rename = "interval_data_seconds")]
    pub intervals: Option<Distribution>,
}

/// Summarize a signal population
///
/// Returns `None` for an empty population; there is nothing to average.
pub fn collect_signal_stats(signals: &[DetectedSignal]) -> Option<StatisticsSummary> {
    let first = signals.first()?;

    let mut hourly_counts: BTreeMap<u32, usize> = BTreeMap::new();
    let mut durations = Vec::with_capacity(signals.len());
    let mut intervals = Vec::new();

    for signal in signals {
        *hourly_counts.entry(signal.start_timestamp.hour()).or_insert(0) += 1;
        durations.push(duration_secs(&signal.duration));
        if let Some(interval) = &signal.interval {
            intervals.push(duration_secs(interval));
        }
    }

    let hourly_rate = hourly_rate(&hourly_counts);
    let durations = Distribution::from_samples(&durations)?;

    Some(StatisticsSummary {
        signal_tag: first.tag.clone(),
        hourly_rate,
        hourly_counts,
        durations,
        intervals: Distribution::from_samples(&intervals),
    })
}

/// Total count over the hour span, a zero-width span counting as one hour
fn hourly_rate(hourly_counts: &BTreeMap<u32, usize>) -> f64 {
    let total: usize = hourly_counts.values().sum();
    let span = match (hourly_counts.keys().next(), hourly_counts.keys().next_back()) {
        (Some(min), Some(max)) => max - min,
        _ => 0,
    };
    total as f64 / span.max(1) as f64
}
