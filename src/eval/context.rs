//! One evaluation pass of an alert rule

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rule::Rule;

/// One fired condition instance within an evaluation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMatch {
    /// Name of the metric/series that matched
    pub metric: String,
    /// Sampled value that fired the condition
    pub value: f64,
    /// Label name → label value, keys unique
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl EvalMatch {
    /// Create a match with no tags
    pub fn new(metric: impl Into<String>, value: f64) -> Self {
        Self {
            metric: metric.into(),
            value,
            tags: HashMap::new(),
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Output of one rule evaluation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalContext {
    /// The rule that was evaluated
    pub rule: Rule,
    /// Ordered sequence of fired condition instances
    pub matches: Vec<EvalMatch>,
    /// When the evaluation started
    pub start_time: DateTime<Utc>,
    /// When the evaluation finished
    pub end_time: DateTime<Utc>,
    /// URL of the rule's dashboard/edit page, if the evaluator could derive one
    rule_url: Option<String>,
}

impl EvalContext {
    /// Create a context with no matches
    pub fn new(rule: Rule, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            rule,
            matches: Vec::new(),
            start_time,
            end_time,
            rule_url: None,
        }
    }

    /// Add a match
    pub fn with_match(mut self, m: EvalMatch) -> Self {
        self.matches.push(m);
        self
    }

    /// Set the resolved rule URL
    pub fn with_rule_url(mut self, url: impl Into<String>) -> Self {
        self.rule_url = Some(url.into());
        self
    }

    /// Resolved rule URL, if any
    pub fn rule_url(&self) -> Option<&str> {
        self.rule_url.as_deref()
    }
}
