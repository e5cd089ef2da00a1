//! Rule file loading and parsing
//!
//! A rule file is TOML with one `[analysis]` table and arrays of `[[events]]`,
//! `[[groups]]` and `[[criteria]]` tables. Thresholds are fractional seconds.

use crate::tokenizer::{EventRule, MessageType};
use anyhow::{Context, Result};
use log_sifter::{
    secs_duration, Criteria, Evaluator, GroupingRule, SifterBuilder, SifterConfig, SignalDetector,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main rule file (loaded from rules.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleFile {
    #[serde(default)]
    pub analysis: SifterConfig,
    pub events: Vec<EventConfig>,
    pub groups: Vec<GroupConfig>,
    pub criteria: Vec<CriteriaConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventConfig {
    pub tag: String,
    /// Regular expression matched from the start of the log line
    pub pattern: String,
    /// Only match lines with this severity letter
    pub message_type: Option<MessageType>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupConfig {
    pub tag: String,
    pub triggers: Vec<String>,
    #[serde(default)]
    pub context: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CriteriaConfig {
    pub symptom: String,
    pub action: String,
    pub signal: SignalConfig,
    pub evaluator: EvaluatorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalConfig {
    pub tag: String,
    #[serde(flatten)]
    pub kind: SignalKindConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalKindConfig {
    Existence {
        group: String,
    },
    IntervalGroup {
        start_group: String,
        end_group: String,
    },
    RepeatGroup {
        group: String,
    },
    IntervalEvent {
        group: String,
        start_event: String,
        end_event: String,
    },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluatorConfig {
    GreaterThan { seconds: f64 },
    GreaterEqual { seconds: f64 },
    LessThan { seconds: f64 },
    LessEqual { seconds: f64 },
    Existence,
}

impl SignalConfig {
    fn to_detector(&self) -> SignalDetector {
        let tag = self.tag.clone();
        match &self.kind {
            SignalKindConfig::Existence { group } => SignalDetector::existence(tag, group),
            SignalKindConfig::IntervalGroup { start_group, end_group } => {
                SignalDetector::interval_group(tag, start_group, end_group)
            }
            SignalKindConfig::RepeatGroup { group } => SignalDetector::repeat_group(tag, group),
            SignalKindConfig::IntervalEvent {
                group,
                start_event,
                end_event,
            } => SignalDetector::interval_event(tag, group, start_event, end_event),
        }
    }
}

impl EvaluatorConfig {
    fn to_evaluator(self) -> Evaluator {
        match self {
            EvaluatorConfig::GreaterThan { seconds } => {
                Evaluator::GreaterThan(secs_duration(seconds))
            }
            EvaluatorConfig::GreaterEqual { seconds } => {
                Evaluator::GreaterEqual(secs_duration(seconds))
            }
            EvaluatorConfig::LessThan { seconds } => Evaluator::LessThan(secs_duration(seconds)),
            EvaluatorConfig::LessEqual { seconds } => Evaluator::LessEqual(secs_duration(seconds)),
            EvaluatorConfig::Existence => Evaluator::Existence,
        }
    }
}

impl RuleFile {
    /// Compile the event rules for the tokenizer
    pub fn event_rules(&self) -> Result<Vec<EventRule>> {
        self.events
            .iter()
            .map(|event| {
                EventRule::new(event.tag.clone(), &event.pattern, event.message_type)
                    .with_context(|| format!("Invalid pattern for event '{}'", event.tag))
            })
            .collect()
    }

    /// Pipeline builder with every group and criteria declared
    pub fn sifter_builder(&self) -> SifterBuilder {
        let mut builder = SifterBuilder::new()
            .declare_event_tags(self.events.iter().map(|e| e.tag.clone()))
            .config(self.analysis.clone());

        for group in &self.groups {
            builder = builder.add_grouping_rule(
                GroupingRule::new(group.tag.clone(), group.triggers.iter().cloned())
                    .with_context(group.context.iter().cloned()),
            );
        }

        for criteria in &self.criteria {
            builder = builder.add_criteria(Criteria::new(
                criteria.symptom.clone(),
                criteria.signal.to_detector(),
                criteria.evaluator.to_evaluator(),
                criteria.action.clone(),
            ));
        }

        builder
    }
}

/// Load a rule file from disk
pub fn load_config(path: &Path) -> Result<RuleFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule file: {:?}", path))?;

    let rules: RuleFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse rule file: {:?}", path))?;

    log::debug!(
        "Rule file declares {} events, {} groups, {} criteria",
        rules.events.len(),
        rules.groups.len(),
        rules.criteria.len()
    );

    Ok(rules)
}
