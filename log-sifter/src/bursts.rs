//! Burst aggregation
//!
//! Walks the detected signal stream in order while holding a cursor into the
//! confirmed positions. The signal at the next confirmed position is a
//! symptom and extends (or opens) the current burst; any other detected
//! signal is innocent and closes it. A confirmed signal with a different tag
//! closes the current burst and opens a new one.

use crate::types::{DetectedSignal, Symptom, SymptomBurst};
use std::collections::BTreeMap;

/// Bursts in detection order, plus the same bursts keyed by symptom tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurstSummary {
    pub bursts: Vec<SymptomBurst>,
    pub burst_dict: BTreeMap<String, Vec<SymptomBurst>>,
}

impl BurstSummary {
    fn close(&mut self, burst: SymptomBurst) {
        log::trace!("Burst of '{}' closed with {} symptoms", burst.tag, burst.symptom_count);
        self.burst_dict
            .entry(burst.tag.clone())
            .or_insert_with(Vec::new)
            .push(burst.clone());
        self.bursts.push(burst);
    }
}

/// Merge consecutive confirmed symptoms into bursts
///
/// `confirmed` holds ascending positions into `detected`, and `symptoms[i]`
/// was built from `detected[confirmed[i]]`. Equal signals at different
/// positions stay distinct.
pub fn detect_bursts(
    detected: &[DetectedSignal],
    confirmed: &[usize],
    symptoms: &[Symptom],
) -> BurstSummary {
    debug_assert_eq!(confirmed.len(), symptoms.len());
    debug_assert!(confirmed.windows(2).all(|w| w[0] < w[1]));

    let mut summary = BurstSummary::default();
    let mut pending = confirmed.iter().zip(symptoms.iter()).peekable();
    let mut open: Option<SymptomBurst> = None;

    for (position, signal) in detected.iter().enumerate() {
        let symptom = match pending.next_if(|(next, _)| **next == position) {
            Some((_, symptom)) => Some(symptom.clone()),
            None => {
                log::trace!("Signal '{}' at {} is innocent", signal.tag, position);
                None
            }
        };

        open = match (open, symptom) {
            (None, Some(symptom)) => Some(SymptomBurst::start(symptom)),
            (Some(mut burst), Some(symptom)) if burst.tag == symptom.tag => {
                burst.push(symptom);
                Some(burst)
            }
            (Some(burst), Some(symptom)) => {
                summary.close(burst);
                Some(SymptomBurst::start(symptom))
            }
            (Some(burst), None) => {
                summary.close(burst);
                None
            }
            (None, None) => None,
        };
    }

    if let Some(burst) = open {
        summary.close(burst);
    }

    log::debug!(
        "Aggregated {} symptoms into {} bursts",
        symptoms.len(),
        summary.bursts.len()
    );
    summary
}
