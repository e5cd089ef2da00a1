//! Signal detectors
//!
//! Each detector consumes the whole chronological group list and produces a
//! chronological list of detected signals. Groups referenced by a detector
//! that never occur simply produce no signals.

use crate::types::{DetectedSignal, EventGroup};
use std::collections::VecDeque;
use std::sync::Arc;

/// What a detector looks for, with only the configuration it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorKind {
    /// One signal per occurrence of a group
    Existence { group_tag: String },
    /// Gap between a start group and the next unmatched end group
    IntervalGroup {
        start_group_tag: String,
        end_group_tag: String,
    },
    /// Gap between consecutive occurrences of the same group
    RepeatGroup { group_tag: String },
    /// Gap between two events inside one group
    IntervalEvent {
        group_tag: String,
        start_event_tag: String,
        end_event_tag: String,
    },
}

/// A tagged signal detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDetector {
    /// Tag carried by every detected signal (and keyed in statistics)
    pub tag: String,
    pub kind: DetectorKind,
}

impl SignalDetector {
    pub fn new(tag: impl Into<String>, kind: DetectorKind) -> Self {
        Self {
            tag: tag.into(),
            kind,
        }
    }

    pub fn existence(tag: impl Into<String>, group_tag: impl Into<String>) -> Self {
        Self::new(
            tag,
            DetectorKind::Existence {
                group_tag: group_tag.into(),
            },
        )
    }

    pub fn interval_group(
        tag: impl Into<String>,
        start_group_tag: impl Into<String>,
        end_group_tag: impl Into<String>,
    ) -> Self {
        Self::new(
            tag,
            DetectorKind::IntervalGroup {
                start_group_tag: start_group_tag.into(),
                end_group_tag: end_group_tag.into(),
            },
        )
    }

    pub fn repeat_group(tag: impl Into<String>, group_tag: impl Into<String>) -> Self {
        Self::new(
            tag,
            DetectorKind::RepeatGroup {
                group_tag: group_tag.into(),
            },
        )
    }

    pub fn interval_event(
        tag: impl Into<String>,
        group_tag: impl Into<String>,
        start_event_tag: impl Into<String>,
        end_event_tag: impl Into<String>,
    ) -> Self {
        Self::new(
            tag,
            DetectorKind::IntervalEvent {
                group_tag: group_tag.into(),
                start_event_tag: start_event_tag.into(),
                end_event_tag: end_event_tag.into(),
            },
        )
    }

    /// Group tags this detector reads
    pub fn group_tags(&self) -> Vec<&str> {
        match &self.kind {
            DetectorKind::Existence { group_tag }
            | DetectorKind::RepeatGroup { group_tag }
            | DetectorKind::IntervalEvent { group_tag, .. } => vec![group_tag.as_str()],
            DetectorKind::IntervalGroup {
                start_group_tag,
                end_group_tag,
            } => vec![start_group_tag.as_str(), end_group_tag.as_str()],
        }
    }

    /// Scan the groups and emit every detected signal in order
    pub fn detect(&self, groups: &[Arc<EventGroup>]) -> Vec<DetectedSignal> {
        let signals = match &self.kind {
            DetectorKind::Existence { group_tag } => self.detect_existence(groups, group_tag),
            DetectorKind::IntervalGroup {
                start_group_tag,
                end_group_tag,
            } => self.detect_interval_group(groups, start_group_tag, end_group_tag),
            DetectorKind::RepeatGroup { group_tag } => self.detect_repeat(groups, group_tag),
            DetectorKind::IntervalEvent {
                group_tag,
                start_event_tag,
                end_event_tag,
            } => self.detect_interval_event(groups, group_tag, start_event_tag, end_event_tag),
        };

        log::debug!("Signal '{}': {} detected", self.tag, signals.len());
        signals
    }

    fn detect_existence(&self, groups: &[Arc<EventGroup>], group_tag: &str) -> Vec<DetectedSignal> {
        groups
            .iter()
            .filter(|group| group.tag() == group_tag)
            .map(|group| DetectedSignal::single(self.tag.clone(), None, Arc::clone(group)))
            .collect()
    }

    fn detect_interval_group(
        &self,
        groups: &[Arc<EventGroup>],
        start_group_tag: &str,
        end_group_tag: &str,
    ) -> Vec<DetectedSignal> {
        let mut signals = Vec::new();
        let mut unmatched: VecDeque<&Arc<EventGroup>> = VecDeque::new();

        for group in groups {
            if group.tag() == start_group_tag {
                unmatched.push_back(group);
            } else if group.tag() == end_group_tag {
                if let Some(start) = unmatched.pop_front() {
                    let interval = group.first_trigger().timestamp - start.last_trigger().timestamp;
                    signals.push(DetectedSignal::spanning(
                        self.tag.clone(),
                        Some(interval),
                        Arc::clone(start),
                        Arc::clone(group),
                    ));
                }
            }
        }

        signals
    }

    fn detect_repeat(&self, groups: &[Arc<EventGroup>], group_tag: &str) -> Vec<DetectedSignal> {
        let mut signals = Vec::new();
        let mut previous: Option<&Arc<EventGroup>> = None;

        for group in groups.iter().filter(|group| group.tag() == group_tag) {
            if let Some(prev) = previous {
                let interval = group.first_trigger().timestamp - prev.last_trigger().timestamp;
                signals.push(DetectedSignal::spanning(
                    self.tag.clone(),
                    Some(interval),
                    Arc::clone(prev),
                    Arc::clone(group),
                ));
            }
            previous = Some(group);
        }

        signals
    }

    fn detect_interval_event(
        &self,
        groups: &[Arc<EventGroup>],
        group_tag: &str,
        start_event_tag: &str,
        end_event_tag: &str,
    ) -> Vec<DetectedSignal> {
        let mut signals = Vec::new();

        for group in groups.iter().filter(|group| group.tag() == group_tag) {
            let mut started_at = None;

            for event in group.all_events() {
                if event.tag == start_event_tag {
                    started_at = Some(event.timestamp);
                } else if event.tag == end_event_tag {
                    if let Some(start) = started_at {
                        signals.push(DetectedSignal::single(
                            self.tag.clone(),
                            Some(event.timestamp - start),
                            Arc::clone(group),
                        ));
                    }
                }
            }
        }

        signals
    }
}
