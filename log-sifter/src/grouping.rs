//! Event grouping engine
//!
//! Correlates the chronological event stream into event groups. Every rule
//! runs independently over the whole stream with one FIFO queue per stage of
//! its trigger sequence:
//!
//! ```text
//! rule: start -> scan -> finish
//!
//! waiting[1]: [g3]        g3 saw `start`, needs `scan`
//! waiting[2]: [g1, g2]    g1 and g2 saw `scan`, need `finish`
//! ```
//!
//! A stage is a position in the trigger sequence, not a tag: a tag listed
//! twice owns two queues. The oldest partial group always advances first, so
//! concurrent instances complete in the order they started. Context events
//! are buffered and attached to whichever group opens next. Partial groups
//! that never see their next stage are dropped at the end of the stream.

use crate::types::{Event, EventGroup, GroupMember};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::mem;
use std::sync::Arc;

/// Defines the ordered trigger events that make up a group and the events
/// that supply context to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingRule {
    /// Tag given to every group this rule produces
    pub tag: String,
    /// Event tags that must be observed in this order (duplicates allowed)
    pub trigger_sequence: Vec<String>,
    /// Event tags buffered and attached to the next group that opens
    #[serde(default)]
    pub context_tags: BTreeSet<String>,
}

impl GroupingRule {
    /// Create a rule from its ordered trigger tags
    pub fn new<I, S>(tag: impl Into<String>, trigger_sequence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag: tag.into(),
            trigger_sequence: trigger_sequence.into_iter().map(Into::into).collect(),
            context_tags: BTreeSet::new(),
        }
    }

    /// Builder method: set the context tags
    pub fn with_context<I, S>(mut self, context_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_tags = context_tags.into_iter().map(Into::into).collect();
        self
    }

    /// Number of stages in the trigger sequence
    pub fn stage_count(&self) -> usize {
        self.trigger_sequence.len()
    }

    /// Every event tag this rule reacts to
    pub fn referenced_tags(&self) -> impl Iterator<Item = &String> + '_ {
        self.trigger_sequence.iter().chain(self.context_tags.iter())
    }

    fn is_trigger_tag(&self, tag: &str) -> bool {
        self.trigger_sequence.iter().any(|t| t == tag)
    }
}

/// Completed groups, chronological across all rules, plus an index by tag
#[derive(Debug, Clone, Default)]
pub struct GroupingOutput {
    /// Groups ordered by the stream position of their completing event
    pub groups: Vec<Arc<EventGroup>>,
    /// The same groups keyed by rule tag, each list chronological
    pub by_tag: HashMap<String, Vec<Arc<EventGroup>>>,
}

impl GroupingOutput {
    /// Groups produced under the given rule tag
    pub fn groups_with_tag(&self, tag: &str) -> &[Arc<EventGroup>] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Applies grouping rules to a complete event stream
pub struct EventGrouper {
    rules: Vec<GroupingRule>,
    parallel: bool,
}

impl EventGrouper {
    /// Create a grouper for the given rules
    pub fn new(rules: Vec<GroupingRule>) -> Self {
        Self {
            rules,
            parallel: false,
        }
    }

    /// Builder method: run rules on the rayon thread pool
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn rules(&self) -> &[GroupingRule] {
        &self.rules
    }

    /// Group the events under every rule
    pub fn group(&self, events: &[Event]) -> GroupingOutput {
        log::debug!(
            "Grouping {} events under {} rules",
            events.len(),
            self.rules.len()
        );

        let per_rule: Vec<Vec<(usize, EventGroup)>> = if self.parallel {
            self.rules
                .par_iter()
                .map(|rule| RuleMatcher::run(rule, events))
                .collect()
        } else {
            self.rules
                .iter()
                .map(|rule| RuleMatcher::run(rule, events))
                .collect()
        };

        // Stable sort keeps rule order for groups completed by the same event
        let mut completed: Vec<(usize, EventGroup)> = per_rule.into_iter().flatten().collect();
        completed.sort_by_key(|(position, _)| *position);

        let mut output = GroupingOutput::default();
        for (_, group) in completed {
            let group = Arc::new(group);
            output
                .by_tag
                .entry(group.tag().to_string())
                .or_insert_with(Vec::new)
                .push(Arc::clone(&group));
            output.groups.push(group);
        }

        log::info!("Assembled {} event groups", output.groups.len());
        output
    }
}

/// A group still waiting on later trigger stages
#[derive(Debug)]
struct PartialGroup {
    members: Vec<GroupMember>,
    first_trigger: usize,
    last_trigger: usize,
    triggers: usize,
}

impl PartialGroup {
    fn open(context: Vec<Event>, trigger: Event) -> Self {
        let mut members: Vec<GroupMember> = context.into_iter().map(GroupMember::Context).collect();
        let first_trigger = members.len();
        members.push(GroupMember::Trigger(trigger));
        Self {
            members,
            first_trigger,
            last_trigger: first_trigger,
            triggers: 1,
        }
    }

    fn push_trigger(&mut self, trigger: Event) {
        self.last_trigger = self.members.len();
        self.members.push(GroupMember::Trigger(trigger));
        self.triggers += 1;
    }

    fn finish(self, rule: &GroupingRule) -> EventGroup {
        assert_eq!(
            self.triggers,
            rule.stage_count(),
            "group '{}' finished with the wrong number of trigger events",
            rule.tag
        );
        EventGroup::assemble(
            rule.tag.clone(),
            self.members,
            self.first_trigger,
            self.last_trigger,
        )
    }
}

/// Matching state for one rule over one stream
struct RuleMatcher<'r> {
    rule: &'r GroupingRule,
    /// `waiting[i]` holds partial groups whose next required stage is `i`;
    /// `waiting[0]` stays empty since stage 0 always opens a new group
    waiting: Vec<VecDeque<PartialGroup>>,
    context: Vec<Event>,
    completed: Vec<(usize, EventGroup)>,
}

impl<'r> RuleMatcher<'r> {
    fn run(rule: &'r GroupingRule, events: &[Event]) -> Vec<(usize, EventGroup)> {
        let mut matcher = Self {
            rule,
            waiting: (0..rule.stage_count()).map(|_| VecDeque::new()).collect(),
            context: Vec::new(),
            completed: Vec::new(),
        };

        for (position, event) in events.iter().enumerate() {
            matcher.observe(position, event);
        }

        let abandoned: usize = matcher.waiting.iter().map(VecDeque::len).sum();
        log::debug!(
            "Rule '{}': {} groups completed, {} left incomplete",
            rule.tag,
            matcher.completed.len(),
            abandoned
        );
        matcher.completed
    }

    fn observe(&mut self, position: usize, event: &Event) {
        if self.rule.is_trigger_tag(&event.tag) {
            self.advance(position, event);
        } else if self.rule.context_tags.contains(&event.tag) {
            log::trace!("Rule '{}': buffering context '{}'", self.rule.tag, event.tag);
            self.context.push(event.clone());
        }
    }

    fn advance(&mut self, position: usize, event: &Event) {
        let last_stage = self.rule.stage_count() - 1;

        // Later stages first: an event feeds exactly one stage
        for stage in (1..=last_stage).rev() {
            if self.rule.trigger_sequence[stage] != event.tag {
                continue;
            }
            if let Some(mut partial) = self.waiting[stage].pop_front() {
                partial.push_trigger(event.clone());
                if stage == last_stage {
                    self.complete(position, partial);
                } else {
                    self.waiting[stage + 1].push_back(partial);
                }
                return;
            }
        }

        if self.rule.trigger_sequence[0] == event.tag {
            let context = mem::take(&mut self.context);
            let partial = PartialGroup::open(context, event.clone());
            if last_stage == 0 {
                self.complete(position, partial);
            } else {
                self.waiting[1].push_back(partial);
            }
        } else {
            log::trace!(
                "Rule '{}': '{}' arrived with no group waiting for it",
                self.rule.tag,
                event.tag
            );
        }
    }

    fn complete(&mut self, position: usize, partial: PartialGroup) {
        let group = partial.finish(self.rule);
        log::trace!(
            "Rule '{}': group of {} events ({} context) completed at event {}",
            self.rule.tag,
            group.event_count(),
            group.context_events().count(),
            position
        );
        self.completed.push((position, group));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn stream(tags: &[&str]) -> Vec<Event> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        tags.iter()
            .enumerate()
            .map(|(i, tag)| Event::new(*tag, base + Duration::seconds(i as i64)))
            .collect()
    }

    fn tags_of<'a>(events: impl Iterator<Item = &'a Event>) -> Vec<String> {
        events.map(|e| e.tag.clone()).collect()
    }

    #[test]
    fn test_single_stage_rule_groups_every_match() {
        let rule = GroupingRule::new("boot", ["B"]).with_context(["X"]);
        let output = EventGrouper::new(vec![rule]).group(&stream(&["B", "X", "X", "B", "B"]));

        assert_eq!(output.groups.len(), 3);
        assert_eq!(output.groups[0].event_count(), 1);
        assert_eq!(tags_of(output.groups[1].all_events()), vec!["X", "X", "B"]);
        assert_eq!(output.groups[2].context_events().count(), 0);
    }

    #[test]
    fn test_fifo_pairing_of_interleaved_instances() {
        let rule = GroupingRule::new("dog", ["D", "O", "G"]);
        let events = stream(&["D", "D", "O", "O", "G", "G"]);
        let output = EventGrouper::new(vec![rule]).group(&events);

        assert_eq!(output.groups.len(), 2);
        let first: Vec<_> = output.groups[0].trigger_events().map(|e| e.timestamp).collect();
        let second: Vec<_> = output.groups[1].trigger_events().map(|e| e.timestamp).collect();
        assert_eq!(first, vec![events[0].timestamp, events[2].timestamp, events[4].timestamp]);
        assert_eq!(second, vec![events[1].timestamp, events[3].timestamp, events[5].timestamp]);
    }

    #[test]
    fn test_context_attaches_to_next_opened_group() {
        let rule = GroupingRule::new("dog", ["D", "O", "G"]).with_context(["X", "Y"]);
        let events = stream(&["Y", "D", "X", "O", "G", "D", "O", "G"]);
        let output = EventGrouper::new(vec![rule]).group(&events);

        assert_eq!(output.groups.len(), 2);
        assert_eq!(tags_of(output.groups[0].all_events()), vec!["Y", "D", "O", "G"]);
        assert_eq!(tags_of(output.groups[1].all_events()), vec!["X", "D", "O", "G"]);
    }

    #[test]
    fn test_repeated_tag_stages_stay_distinct() {
        let rule = GroupingRule::new("double", ["D", "D", "O"]);
        let output = EventGrouper::new(vec![rule]).group(&stream(&["D", "D", "D", "O", "D", "O"]));

        // D1+D2+O4 and D3+D5+O6
        assert_eq!(output.groups.len(), 2);
        for group in &output.groups {
            assert_eq!(tags_of(group.trigger_events()), vec!["D", "D", "O"]);
        }
    }

    #[test]
    fn test_incomplete_groups_are_never_emitted() {
        let rule = GroupingRule::new("dog", ["D", "O", "G"]);
        let output = EventGrouper::new(vec![rule]).group(&stream(&["D", "O", "D", "G", "O"]));

        assert_eq!(output.groups.len(), 1);
    }

    #[test]
    fn test_stray_later_stage_is_ignored() {
        let rule = GroupingRule::new("dog", ["D", "O", "G"]).with_context(["O"]);
        let output = EventGrouper::new(vec![rule]).group(&stream(&["O", "G", "D", "O", "G"]));

        // Trigger tags never fall back to context
        assert_eq!(output.groups.len(), 1);
        assert_eq!(output.groups[0].event_count(), 3);
    }

    #[test]
    fn test_groups_merge_chronologically_across_rules() {
        let rules = vec![
            GroupingRule::new("slow", ["A", "C"]),
            GroupingRule::new("fast", ["B"]),
        ];
        let output = EventGrouper::new(rules)
            .with_parallel(true)
            .group(&stream(&["A", "B", "C", "B"]));

        let order: Vec<&str> = output.groups.iter().map(|g| g.tag()).collect();
        assert_eq!(order, vec!["fast", "slow", "fast"]);
        assert_eq!(output.groups_with_tag("fast").len(), 2);
        assert_eq!(output.groups_with_tag("slow").len(), 1);
        assert!(output.groups_with_tag("missing").is_empty());
    }

    #[test]
    fn test_completed_never_exceeds_openings() {
        let rule = GroupingRule::new("pair", ["A", "B"]);
        let output = EventGrouper::new(vec![rule]).group(&stream(&["A", "B", "B", "B", "A"]));

        assert_eq!(output.groups.len(), 1);
    }
}
