//! Strategy selection: (intent, emotion) to a directive appended to the persona.
//!
//! Two policies sit behind [`StrategySelector`]:
//!
//! - [`AxisStrategySelector`] looks each axis up independently and joins the
//!   results, intent first.
//! - [`RuleStrategySelector`] resolves prioritized rule rows to at most one
//!   strategy.
//!
//! They are alternatives. Neither is layered on the other.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{StrategyPolicy, TurnConfig};

/// Intent reported for anything outside the active intent set.
pub const UNKNOWN_INTENT: &str = "unknown-intent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyAxis {
    Intent,
    Emotion,
}

/// A directive text keyed by an intent or emotion label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub key: String,
    pub value: String,
    pub axis: StrategyAxis,
    pub is_active: bool,
}

impl Strategy {
    /// An active strategy.
    pub fn new(axis: StrategyAxis, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            axis,
            is_active: true,
        }
    }
}

/// A rule row: when intent (and optionally emotion) match, apply `strategy_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRule {
    pub priority: i32,
    pub trigger_intent: String,
    #[serde(default)]
    pub trigger_emotion: Option<String>,
    pub strategy_key: String,
}

impl StrategyRule {
    pub fn new(
        priority: i32,
        trigger_intent: impl Into<String>,
        trigger_emotion: Option<&str>,
        strategy_key: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            trigger_intent: trigger_intent.into(),
            trigger_emotion: trigger_emotion.map(str::to_string),
            strategy_key: strategy_key.into(),
        }
    }

    fn is_intent_only(&self) -> bool {
        self.trigger_emotion
            .as_deref()
            .map_or(true, |e| e.trim().is_empty())
    }
}

/// Maps a classified (intent, emotion) pair to directive text, possibly empty.
pub trait StrategySelector: Send + Sync {
    fn select(&self, intent: &str, emotion: &str) -> String;
}

/// Per-axis lookup in the active strategy maps.
#[derive(Debug, Clone, Default)]
pub struct AxisStrategySelector {
    intents: HashMap<String, String>,
    emotions: HashMap<String, String>,
}

impl AxisStrategySelector {
    pub fn new(intents: HashMap<String, String>, emotions: HashMap<String, String>) -> Self {
        Self { intents, emotions }
    }
}

impl StrategySelector for AxisStrategySelector {
    fn select(&self, intent: &str, emotion: &str) -> String {
        let lookup = |map: &HashMap<String, String>, key: &str| {
            map.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        match (lookup(&self.intents, intent), lookup(&self.emotions, emotion)) {
            (Some(i), Some(e)) => format!("{}\n{}", i, e),
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => String::new(),
        }
    }
}

/// Two-tier rule engine over [`StrategyRule`] rows.
///
/// Tier one matches intent and emotion exactly; tier two matches intent among
/// rows without an emotion trigger. Within a tier the highest priority wins,
/// and the earlier row wins a tie. The matched rule's strategy must exist and
/// be active, otherwise the result is empty.
#[derive(Debug, Clone, Default)]
pub struct RuleStrategySelector {
    rules: Vec<StrategyRule>,
    strategies: HashMap<String, Strategy>,
}

impl RuleStrategySelector {
    pub fn new(rules: Vec<StrategyRule>, strategies: Vec<Strategy>) -> Self {
        let strategies = strategies.into_iter().map(|s| (s.key.clone(), s)).collect();
        Self { rules, strategies }
    }

    fn best<'a>(&'a self, matches: impl Iterator<Item = &'a StrategyRule>) -> Option<&'a StrategyRule> {
        matches.fold(None, |best: Option<&StrategyRule>, rule| match best {
            Some(b) if b.priority >= rule.priority => Some(b),
            _ => Some(rule),
        })
    }

    fn resolve(&self, intent: &str, emotion: &str) -> Option<&StrategyRule> {
        let exact = self.best(self.rules.iter().filter(|r| {
            r.trigger_intent == intent
                && !emotion.is_empty()
                && r.trigger_emotion.as_deref() == Some(emotion)
        }));
        exact.or_else(|| {
            self.best(
                self.rules
                    .iter()
                    .filter(|r| r.trigger_intent == intent && r.is_intent_only()),
            )
        })
    }
}

impl StrategySelector for RuleStrategySelector {
    fn select(&self, intent: &str, emotion: &str) -> String {
        let Some(rule) = self.resolve(intent, emotion) else {
            return String::new();
        };

        match self.strategies.get(&rule.strategy_key) {
            Some(strategy) if strategy.is_active => strategy.value.clone(),
            _ => {
                debug!(
                    strategy = %rule.strategy_key,
                    "Matched rule points at a missing or inactive strategy"
                );
                String::new()
            }
        }
    }
}

/// Selector for a turn under `policy`.
pub fn selector_for(policy: StrategyPolicy, config: &TurnConfig) -> Box<dyn StrategySelector> {
    let use_rules = match policy {
        StrategyPolicy::PerAxis => false,
        StrategyPolicy::RuleEngine => true,
        StrategyPolicy::Auto => !config.strategy_rules.is_empty(),
    };

    if use_rules {
        Box::new(RuleStrategySelector::new(
            config.strategy_rules.clone(),
            config.strategies.clone(),
        ))
    } else {
        Box::new(AxisStrategySelector::new(
            config.intent_strategies.clone(),
            config.emotion_strategies.clone(),
        ))
    }
}

/// Intents the pipeline recognizes this turn: active intent strategies plus
/// the intents named by rule rows.
pub fn known_intents(config: &TurnConfig) -> HashSet<&str> {
    config
        .intent_strategies
        .keys()
        .map(String::as_str)
        .chain(config.strategy_rules.iter().map(|r| r.trigger_intent.as_str()))
        .collect()
}

/// `intent` if recognized, else [`UNKNOWN_INTENT`].
pub fn remap_intent(intent: &str, known: &HashSet<&str>) -> String {
    let intent = intent.trim();
    if known.contains(intent) {
        intent.to_string()
    } else {
        UNKNOWN_INTENT.to_string()
    }
}
