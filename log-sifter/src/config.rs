//! Pipeline configuration types
//!
//! This module defines the switches that change how the pipeline runs, not
//! what it looks for. Rules and criteria are handed to the builder directly.

use serde::{Deserialize, Serialize};

/// Configuration for a sifting run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SifterConfig {
    /// Whether to summarize every criteria's detected signal population
    #[serde(default)]
    pub collect_statistics: bool,

    /// Evaluate grouping rules and criteria on the rayon thread pool
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Sort the concatenated signal streams by start time before burst
    /// aggregation (default keeps criteria configuration order)
    #[serde(default)]
    pub chronological_bursts: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SifterConfig {
    fn default() -> Self {
        Self {
            collect_statistics: false,
            parallel: true,
            chronological_bursts: false,
        }
    }
}

impl SifterConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable statistics collection
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.collect_statistics = enabled;
        self
    }

    /// Builder method: enable or disable parallel evaluation
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Builder method: enable or disable chronological burst ordering
    pub fn with_chronological_bursts(mut self, enabled: bool) -> Self {
        self.chronological_bursts = enabled;
        self
    }
}
