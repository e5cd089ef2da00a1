//! Threshold evaluators over detected signal intervals

use crate::types::DetectedSignal;
use chrono::Duration;

/// Predicate deciding whether a detected signal is confirmed
///
/// Threshold variants compare the signal's interval; a signal without an
/// interval never passes a threshold. `Existence` confirms everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluator {
    GreaterThan(Duration),
    GreaterEqual(Duration),
    LessThan(Duration),
    LessEqual(Duration),
    Existence,
}

impl Evaluator {
    pub fn evaluate(&self, value: Option<Duration>) -> bool {
        match (*self, value) {
            (Evaluator::Existence, _) => true,
            (_, None) => false,
            (Evaluator::GreaterThan(threshold), Some(v)) => v > threshold,
            (Evaluator::GreaterEqual(threshold), Some(v)) => v >= threshold,
            (Evaluator::LessThan(threshold), Some(v)) => v < threshold,
            (Evaluator::LessEqual(threshold), Some(v)) => v <= threshold,
        }
    }

    /// Positions of the signals that pass, ascending
    pub fn confirm(&self, signals: &[DetectedSignal]) -> Vec<usize> {
        signals
            .iter()
            .enumerate()
            .filter(|(_, signal)| self.evaluate(signal.interval))
            .map(|(position, _)| position)
            .collect()
    }
}
