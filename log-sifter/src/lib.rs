//! Log Sifter Library
//!
//! Turns a tokenized system log into reports of recurring problems.
//!
//! # Architecture
//!
//! The pipeline runs over a complete, already-loaded event sequence:
//! - Grouping rules correlate tagged events into event groups
//! - Signal detectors measure occurrences and gaps over those groups
//! - Evaluators confirm signals against thresholds, criteria turn confirmed
//!   signals into symptoms
//! - Consecutive symptoms of one tag are merged into bursts, and optional
//!   statistics summarize every detected signal population
//!
//! The library does NOT:
//! - Read log files or tokenize raw lines
//! - Parse command lines or rule files
//! - Render reports
//!
//! All of that lives in the application layer (log-sifter-cli).
//!
//! # Example Usage
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use log_sifter::{Criteria, Evaluator, Event, GroupingRule, SignalDetector, Sifter};
//!
//! let sifter = Sifter::builder()
//!     .add_grouping_rule(
//!         GroupingRule::new("platform_rescan", ["start_rescan", "finish_rescan"])
//!             .with_context(["hotplug"]),
//!     )
//!     .add_criteria(Criteria::new(
//!         "Rescan Loop Mode",
//!         SignalDetector::repeat_group("platform_rescan_signal", "platform_rescan"),
//!         Evaluator::LessThan(Duration::seconds(5)),
//!         "Please contact hardware maintainer.",
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
//! let events = vec![
//!     Event::new("start_rescan", t0),
//!     Event::new("finish_rescan", t0 + Duration::seconds(1)),
//!     Event::new("start_rescan", t0 + Duration::seconds(3)),
//!     Event::new("finish_rescan", t0 + Duration::seconds(4)),
//! ];
//!
//! let report = sifter.sift(&events);
//! assert_eq!(report.bursts.len(), 1);
//! assert_eq!(report.burst_dict["Rescan Loop Mode"][0].symptom_count, 1);
//! ```

// Public modules
pub mod analyzer;
pub mod bursts;
pub mod config;
pub mod criteria;
pub mod grouping;
pub mod sifter;
pub mod signals;
pub mod statistics;
pub mod types;

// Re-export main types for convenience
pub use analyzer::{AnalysisOutcome, SymptomAnalyzer};
pub use bursts::{detect_bursts, BurstSummary};
pub use config::SifterConfig;
pub use criteria::{Criteria, CriteriaOutput};
pub use grouping::{EventGrouper, GroupingOutput, GroupingRule};
pub use sifter::{SiftReport, Sifter, SifterBuilder};
pub use signals::{DetectorKind, Evaluator, SignalDetector};
pub use statistics::{collect_signal_stats, Distribution, StatisticsSummary};
pub use types::{
    duration_secs, secs_duration, DetectedSignal, Event, EventGroup, GroupMember, Result,
    SifterError, Symptom, SymptomBurst, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty builder is a configuration error
        let result = Sifter::builder().build();
        assert!(matches!(result, Err(SifterError::NoGroupingRules)));
    }
}
