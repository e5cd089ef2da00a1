//! Symptom criteria
//!
//! A criteria couples a signal detector with an evaluator and turns every
//! confirmed signal into a symptom carrying the criteria's tag and action
//! message.

use crate::signals::{Evaluator, SignalDetector};
use crate::statistics::{collect_signal_stats, StatisticsSummary};
use crate::types::{DetectedSignal, EventGroup, Symptom};
use std::sync::Arc;

/// Rule for recognizing one kind of symptom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    pub symptom_tag: String,
    pub signal: SignalDetector,
    pub evaluator: Evaluator,
    pub action_msg: String,
}

/// Everything one criteria produced over a group list
#[derive(Debug, Clone, Default)]
pub struct CriteriaOutput {
    pub symptoms: Vec<Symptom>,
    pub detected_signals: Vec<DetectedSignal>,
    /// Positions in `detected_signals` of the confirmed signals, parallel
    /// to `symptoms`
    pub confirmed: Vec<usize>,
    pub statistics: Option<StatisticsSummary>,
}

impl Criteria {
    pub fn new(
        symptom_tag: impl Into<String>,
        signal: SignalDetector,
        evaluator: Evaluator,
        action_msg: impl Into<String>,
    ) -> Self {
        Self {
            symptom_tag: symptom_tag.into(),
            signal,
            evaluator,
            action_msg: action_msg.into(),
        }
    }

    /// Detect, evaluate and build symptoms over the full group list
    ///
    /// Statistics cover every detected signal, not only confirmed ones, and
    /// are skipped when nothing was detected.
    pub fn apply(&self, groups: &[Arc<EventGroup>], collect_statistics: bool) -> CriteriaOutput {
        let detected_signals = self.signal.detect(groups);
        let confirmed = self.evaluator.confirm(&detected_signals);
        let symptoms = self.build_symptoms(&detected_signals, &confirmed);

        let statistics = if collect_statistics {
            collect_signal_stats(&detected_signals)
        } else {
            None
        };

        log::debug!(
            "Criteria '{}': {} of {} signals confirmed",
            self.symptom_tag,
            confirmed.len(),
            detected_signals.len()
        );

        CriteriaOutput {
            symptoms,
            detected_signals,
            confirmed,
            statistics,
        }
    }

    fn build_symptoms(&self, detected: &[DetectedSignal], confirmed: &[usize]) -> Vec<Symptom> {
        confirmed
            .iter()
            .map(|&position| {
                Symptom::new(
                    self.symptom_tag.clone(),
                    self.action_msg.clone(),
                    detected[position].clone(),
                )
            })
            .collect()
    }
}
