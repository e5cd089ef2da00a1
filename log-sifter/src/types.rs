//! Core types for the log sifter library
//!
//! This module defines the records that flow through the analysis pipeline:
//! tokenized events, the event groups assembled from them, the signals
//! detected over those groups, and the symptoms and bursts reported at the
//! end. Everything here is immutable once handed to the next stage.

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Timestamp type used throughout the pipeline
pub type Timestamp = DateTime<Utc>;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, SifterError>;

/// Configuration errors, reported when the pipeline is built
///
/// Nothing that happens while sifting an event stream is an error: rules and
/// criteria that never match simply produce empty output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SifterError {
    #[error("No grouping rules defined")]
    NoGroupingRules,

    #[error("No criteria defined")]
    NoCriteria,

    #[error("Grouping rule '{0}' has an empty trigger sequence")]
    EmptyTriggerSequence(String),

    #[error("Grouping rule '{0}' is defined more than once")]
    DuplicateGroupingRule(String),

    #[error("Grouping rule '{rule}' references undefined event tag '{tag}'")]
    UndefinedEventTag { rule: String, tag: String },

    #[error("Criteria '{criteria}' references undefined group tag '{tag}'")]
    UndefinedGroupTag { criteria: String, tag: String },
}

/// A single recognized log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Tag of the event rule that recognized the line
    pub tag: String,
    /// Absolute time the line was logged
    pub timestamp: Timestamp,
    /// Named fields captured by the event rule and the line parser
    pub captured_fields: BTreeMap<String, String>,
}

impl Event {
    /// Create an event without captured fields
    pub fn new(tag: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            tag: tag.into(),
            timestamp,
            captured_fields: BTreeMap::new(),
        }
    }

    /// Builder method: attach a captured field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.captured_fields.insert(name.into(), value.into());
        self
    }

    /// Look up a captured field by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.captured_fields.get(name).map(String::as_str)
    }
}

/// One event inside a group, tagged with the role it plays there
///
/// A member is either a trigger or a context event, never both, so a group
/// can only ever grow by one role at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum GroupMember {
    Trigger(Event),
    Context(Event),
}

impl GroupMember {
    pub fn event(&self) -> &Event {
        match self {
            GroupMember::Trigger(event) | GroupMember::Context(event) => event,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, GroupMember::Trigger(_))
    }
}

/// A completed correlation of trigger (and context) events
///
/// Members are kept in chronological order; trigger and context views are
/// derived from that single list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventGroup {
    tag: String,
    #[serde(rename = "ordered_events")]
    members: Vec<GroupMember>,
    #[serde(skip)]
    first_trigger: usize,
    #[serde(skip)]
    last_trigger: usize,
}

impl EventGroup {
    /// Assemble a group from members in the order they were observed
    ///
    /// Returns `None` when no trigger event is present.
    pub fn from_members(tag: impl Into<String>, members: Vec<GroupMember>) -> Option<Self> {
        let first_trigger = members.iter().position(GroupMember::is_trigger)?;
        let last_trigger = members.iter().rposition(GroupMember::is_trigger)?;
        Some(Self::assemble(tag.into(), members, first_trigger, last_trigger))
    }

    pub(crate) fn assemble(
        tag: String,
        members: Vec<GroupMember>,
        first_trigger: usize,
        last_trigger: usize,
    ) -> Self {
        assert!(
            members.get(first_trigger).is_some_and(GroupMember::is_trigger)
                && members.get(last_trigger).is_some_and(GroupMember::is_trigger),
            "event group '{}' assembled without trigger events",
            tag
        );
        Self {
            tag,
            members,
            first_trigger,
            last_trigger,
        }
    }

    /// Tag of the grouping rule that produced this group
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// All events in chronological order
    pub fn all_events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.members.iter().map(GroupMember::event)
    }

    /// Trigger events, in rule order
    pub fn trigger_events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.members
            .iter()
            .filter(|m| m.is_trigger())
            .map(GroupMember::event)
    }

    /// Context events, in the order they were buffered
    pub fn context_events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.members
            .iter()
            .filter(|m| !m.is_trigger())
            .map(GroupMember::event)
    }

    pub fn first_trigger(&self) -> &Event {
        self.members[self.first_trigger].event()
    }

    pub fn last_trigger(&self) -> &Event {
        self.members[self.last_trigger].event()
    }

    /// Number of trigger and context events
    pub fn event_count(&self) -> usize {
        self.members.len()
    }
}

/// A signal found in the event group sequence
///
/// `duration` always spans from the first trigger of the first group to the
/// last trigger of the last group. `interval` is only set by detectors that
/// measure a gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedSignal {
    pub tag: String,
    #[serde(serialize_with = "serialize_opt_secs", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,
    pub start_timestamp: Timestamp,
    pub end_timestamp: Timestamp,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub groups: Vec<Arc<EventGroup>>,
}

impl DetectedSignal {
    /// Signal derived from a single group
    pub fn single(
        tag: impl Into<String>,
        interval: Option<Duration>,
        group: Arc<EventGroup>,
    ) -> Self {
        let start_timestamp = group.first_trigger().timestamp;
        let end_timestamp = group.last_trigger().timestamp;
        Self {
            tag: tag.into(),
            interval,
            start_timestamp,
            end_timestamp,
            duration: end_timestamp - start_timestamp,
            groups: vec![group],
        }
    }

    /// Signal spanning from one group to a later one
    pub fn spanning(
        tag: impl Into<String>,
        interval: Option<Duration>,
        first: Arc<EventGroup>,
        last: Arc<EventGroup>,
    ) -> Self {
        let start_timestamp = first.first_trigger().timestamp;
        let end_timestamp = last.last_trigger().timestamp;
        Self {
            tag: tag.into(),
            interval,
            start_timestamp,
            end_timestamp,
            duration: end_timestamp - start_timestamp,
            groups: vec![first, last],
        }
    }
}

/// A confirmed signal, reported with an operator-facing action message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symptom {
    pub tag: String,
    pub action_msg: String,
    pub start_timestamp: Timestamp,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub signal: DetectedSignal,
}

impl Symptom {
    pub fn new(
        tag: impl Into<String>,
        action_msg: impl Into<String>,
        signal: DetectedSignal,
    ) -> Self {
        Self {
            tag: tag.into(),
            action_msg: action_msg.into(),
            start_timestamp: signal.start_timestamp,
            duration: signal.duration,
            signal,
        }
    }
}

/// A run of consecutive symptoms sharing one tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymptomBurst {
    pub tag: String,
    pub burst_start_timestamp: Timestamp,
    pub action_msg: String,
    pub symptom_count: usize,
    /// Sum of the member symptoms' durations
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub symptoms: Vec<Symptom>,
}

impl SymptomBurst {
    /// Open a burst with its first symptom
    pub fn start(first: Symptom) -> Self {
        Self {
            tag: first.tag.clone(),
            burst_start_timestamp: first.start_timestamp,
            action_msg: first.action_msg.clone(),
            symptom_count: 1,
            duration: first.duration,
            symptoms: vec![first],
        }
    }

    /// Append a symptom of the same tag
    pub fn push(&mut self, symptom: Symptom) {
        assert_eq!(
            symptom.tag, self.tag,
            "burst of '{}' cannot absorb a '{}' symptom",
            self.tag, symptom.tag
        );
        self.duration = self.duration + symptom.duration;
        self.symptoms.push(symptom);
        self.symptom_count = self.symptoms.len();
    }
}

/// Fractional seconds, as reported for durations and intervals
pub fn duration_secs(duration: &Duration) -> f64 {
    match duration.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => duration.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Duration from fractional seconds (microsecond precision)
pub fn secs_duration(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

fn serialize_secs<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration_secs(duration))
}

fn serialize_opt_secs<S: Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match duration {
        Some(d) => serializer.serialize_some(&duration_secs(d)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(sec: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, sec).unwrap()
    }

    #[test]
    fn test_group_views() {
        let group = EventGroup::from_members(
            "rescan",
            vec![
                GroupMember::Context(Event::new("hotplug", ts(0))),
                GroupMember::Trigger(Event::new("start", ts(1))),
                GroupMember::Trigger(Event::new("finish", ts(4))),
            ],
        )
        .unwrap();

        assert_eq!(group.tag(), "rescan");
        assert_eq!(group.event_count(), 3);
        assert_eq!(group.trigger_events().count(), 2);
        assert_eq!(group.context_events().count(), 1);
        assert_eq!(group.first_trigger().tag, "start");
        assert_eq!(group.last_trigger().tag, "finish");
    }

    #[test]
    fn test_group_requires_trigger() {
        let members = vec![GroupMember::Context(Event::new("hotplug", ts(0)))];
        assert!(EventGroup::from_members("rescan", members).is_none());
    }

    #[test]
    fn test_signal_duration_spans_groups() {
        let first = Arc::new(
            EventGroup::from_members("a", vec![GroupMember::Trigger(Event::new("x", ts(2)))])
                .unwrap(),
        );
        let last = Arc::new(
            EventGroup::from_members("b", vec![GroupMember::Trigger(Event::new("y", ts(9)))])
                .unwrap(),
        );
        let signal = DetectedSignal::spanning("gap", Some(Duration::seconds(7)), first, last);

        assert_eq!(signal.start_timestamp, ts(2));
        assert_eq!(signal.end_timestamp, ts(9));
        assert_eq!(signal.duration, Duration::seconds(7));
        assert_eq!(signal.groups.len(), 2);
    }

    #[test]
    fn test_burst_accumulates_duration() {
        let group = Arc::new(
            EventGroup::from_members(
                "a",
                vec![
                    GroupMember::Trigger(Event::new("x", ts(0))),
                    GroupMember::Trigger(Event::new("y", ts(3))),
                ],
            )
            .unwrap(),
        );
        let signal = DetectedSignal::single("sig", None, group);
        let mut burst = SymptomBurst::start(Symptom::new("Loop", "Call someone.", signal.clone()));
        burst.push(Symptom::new("Loop", "Call someone.", signal));

        assert_eq!(burst.symptom_count, 2);
        assert_eq!(burst.duration, Duration::seconds(6));
        assert_eq!(burst.burst_start_timestamp, ts(0));
    }

    #[test]
    #[should_panic]
    fn test_burst_rejects_foreign_tag() {
        let group = Arc::new(
            EventGroup::from_members("a", vec![GroupMember::Trigger(Event::new("x", ts(0)))])
                .unwrap(),
        );
        let signal = DetectedSignal::single("sig", None, group);
        let mut burst = SymptomBurst::start(Symptom::new("Loop", "msg", signal.clone()));
        burst.push(Symptom::new("Other", "msg", signal));
    }

    #[test]
    fn test_duration_secs_conversion() {
        assert_eq!(duration_secs(&Duration::milliseconds(1500)), 1.5);
        assert_eq!(secs_duration(2.25), Duration::microseconds(2_250_000));
    }
}
