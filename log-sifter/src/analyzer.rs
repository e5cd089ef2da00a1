//! Group/signal orchestration
//!
//! Runs every criteria over the same group list, concatenates their outputs
//! in configuration order and hands the streams to burst aggregation.
//! Criteria only read the shared groups, so they may run in parallel; the
//! merge and the burst walk stay sequential.

use crate::bursts::{detect_bursts, BurstSummary};
use crate::config::SifterConfig;
use crate::criteria::{Criteria, CriteriaOutput};
use crate::statistics::StatisticsSummary;
use crate::types::{DetectedSignal, EventGroup, Symptom, SymptomBurst};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Final state of an analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// Every symptom found, criteria by criteria
    pub symptoms: Vec<Symptom>,
    pub bursts: Vec<SymptomBurst>,
    pub burst_dict: BTreeMap<String, Vec<SymptomBurst>>,
    /// Keyed by signal tag; empty unless statistics were requested
    pub statistics: BTreeMap<String, StatisticsSummary>,
}

/// Applies criteria to event groups and aggregates the resulting symptoms
pub struct SymptomAnalyzer {
    criteria: Vec<Criteria>,
    config: SifterConfig,
}

impl SymptomAnalyzer {
    pub fn new(criteria: Vec<Criteria>, config: SifterConfig) -> Self {
        Self { criteria, config }
    }

    pub fn criteria(&self) -> &[Criteria] {
        &self.criteria
    }

    /// Run all criteria and detect bursts in their combined output
    pub fn analyze(&self, groups: &[Arc<EventGroup>]) -> AnalysisOutcome {
        let collect_statistics = self.config.collect_statistics;

        let outputs: Vec<CriteriaOutput> = if self.config.parallel {
            self.criteria
                .par_iter()
                .map(|criteria| criteria.apply(groups, collect_statistics))
                .collect()
        } else {
            self.criteria
                .iter()
                .map(|criteria| criteria.apply(groups, collect_statistics))
                .collect()
        };

        let mut symptoms = Vec::new();
        let mut detected = Vec::new();
        let mut confirmed = Vec::new();
        let mut statistics = BTreeMap::new();

        for output in outputs {
            if let Some(summary) = output.statistics {
                statistics.insert(summary.signal_tag.clone(), summary);
            }
            let offset = detected.len();
            confirmed.extend(output.confirmed.iter().map(|position| offset + position));
            symptoms.extend(output.symptoms);
            detected.extend(output.detected_signals);
        }

        if self.config.chronological_bursts {
            sort_chronologically(&mut detected, &mut confirmed, &mut symptoms);
        }

        let BurstSummary { bursts, burst_dict } = detect_bursts(&detected, &confirmed, &symptoms);

        log::info!(
            "Found {} symptoms in {} bursts across {} criteria",
            symptoms.len(),
            bursts.len(),
            self.criteria.len()
        );

        AnalysisOutcome {
            symptoms,
            bursts,
            burst_dict,
            statistics,
        }
    }
}

/// Stable sort of all streams by signal start time
///
/// Confirmed positions are remapped to the sorted detected stream, so they
/// stay ascending and still point at the signal each symptom came from.
fn sort_chronologically(
    detected: &mut Vec<DetectedSignal>,
    confirmed: &mut Vec<usize>,
    symptoms: &mut Vec<Symptom>,
) {
    let mut order: Vec<usize> = (0..detected.len()).collect();
    order.sort_by_key(|&position| detected[position].start_timestamp);

    let mut rank = vec![0; order.len()];
    for (new_position, &old_position) in order.iter().enumerate() {
        rank[old_position] = new_position;
    }

    let mut slots: Vec<Option<DetectedSignal>> = detected.drain(..).map(Some).collect();
    *detected = order.iter().filter_map(|&position| slots[position].take()).collect();

    let mut pairs: Vec<(usize, Symptom)> = confirmed
        .drain(..)
        .map(|position| rank[position])
        .zip(symptoms.drain(..))
        .collect();
    pairs.sort_by_key(|(position, _)| *position);
    let (sorted_confirmed, sorted_symptoms): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();

    *confirmed = sorted_confirmed;
    *symptoms = sorted_symptoms;
}
