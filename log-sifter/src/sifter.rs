//! Main pipeline API
//!
//! `SifterBuilder` collects grouping rules and criteria and validates them;
//! the resulting `Sifter` runs grouping and analysis over a complete event
//! sequence and returns a `SiftReport`.

use crate::analyzer::SymptomAnalyzer;
use crate::config::SifterConfig;
use crate::criteria::Criteria;
use crate::grouping::{EventGrouper, GroupingRule};
use crate::statistics::StatisticsSummary;
use crate::types::{Event, Result, SifterError, Symptom, SymptomBurst};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Result contract handed to reporters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiftReport {
    /// Keyed by signal tag; empty unless statistics were requested
    pub statistics: BTreeMap<String, StatisticsSummary>,
    #[serde(rename = "symptom_bursts")]
    pub bursts: Vec<SymptomBurst>,
    #[serde(skip)]
    pub burst_dict: BTreeMap<String, Vec<SymptomBurst>>,
    #[serde(skip)]
    pub symptoms: Vec<Symptom>,
    /// Number of event groups assembled before analysis
    #[serde(skip)]
    pub group_count: usize,
}

impl SiftReport {
    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty()
    }
}

/// Collects and validates the pipeline definition
#[derive(Debug, Clone, Default)]
pub struct SifterBuilder {
    grouping_rules: Vec<GroupingRule>,
    criteria: Vec<Criteria>,
    event_tags: BTreeSet<String>,
    config: SifterConfig,
}

impl SifterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_grouping_rule(mut self, rule: GroupingRule) -> Self {
        self.grouping_rules.push(rule);
        self
    }

    pub fn add_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria.push(criteria);
        self
    }

    /// Declare the event tags the tokenizer can produce
    ///
    /// When any are declared, grouping rules may only reference these.
    pub fn declare_event_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn config(mut self, config: SifterConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the definition and build the pipeline
    pub fn build(self) -> Result<Sifter> {
        if self.grouping_rules.is_empty() {
            return Err(SifterError::NoGroupingRules);
        }
        if self.criteria.is_empty() {
            return Err(SifterError::NoCriteria);
        }

        let mut rule_tags = HashSet::new();
        for rule in &self.grouping_rules {
            if rule.trigger_sequence.is_empty() {
                return Err(SifterError::EmptyTriggerSequence(rule.tag.clone()));
            }
            if !rule_tags.insert(rule.tag.as_str()) {
                return Err(SifterError::DuplicateGroupingRule(rule.tag.clone()));
            }
            if !self.event_tags.is_empty() {
                if let Some(tag) = rule.referenced_tags().find(|t| !self.event_tags.contains(*t)) {
                    return Err(SifterError::UndefinedEventTag {
                        rule: rule.tag.clone(),
                        tag: tag.clone(),
                    });
                }
            }
        }

        for criteria in &self.criteria {
            if let Some(tag) = criteria
                .signal
                .group_tags()
                .into_iter()
                .find(|t| !rule_tags.contains(t))
            {
                return Err(SifterError::UndefinedGroupTag {
                    criteria: criteria.symptom_tag.clone(),
                    tag: tag.to_string(),
                });
            }
        }

        log::debug!(
            "Built sifter with {} grouping rules and {} criteria",
            self.grouping_rules.len(),
            self.criteria.len()
        );

        Ok(Sifter {
            grouper: EventGrouper::new(self.grouping_rules).with_parallel(self.config.parallel),
            analyzer: SymptomAnalyzer::new(self.criteria, self.config.clone()),
            config: self.config,
        })
    }
}

/// A validated, ready-to-run pipeline
pub struct Sifter {
    grouper: EventGrouper,
    analyzer: SymptomAnalyzer,
    config: SifterConfig,
}

impl Sifter {
    pub fn builder() -> SifterBuilder {
        SifterBuilder::new()
    }

    pub fn config(&self) -> &SifterConfig {
        &self.config
    }

    pub fn grouping_rules(&self) -> &[GroupingRule] {
        self.grouper.rules()
    }

    pub fn criteria(&self) -> &[Criteria] {
        self.analyzer.criteria()
    }

    /// Group the events, apply every criteria and aggregate bursts
    pub fn sift(&self, events: &[Event]) -> SiftReport {
        log::info!("Sifting {} events", events.len());

        let grouping = self.grouper.group(events);
        let outcome = self.analyzer.analyze(&grouping.groups);

        SiftReport {
            statistics: outcome.statistics,
            bursts: outcome.bursts,
            burst_dict: outcome.burst_dict,
            symptoms: outcome.symptoms,
            group_count: grouping.groups.len(),
        }
    }
}
