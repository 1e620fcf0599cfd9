//! Wire-format alert payloads

use std::collections::BTreeMap;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::eval::EvalContext;

/// `endsAt` sentinel the receiver interprets as "not yet resolved"
pub const ENDS_AT_STILL_FIRING: &str = "0001-01-01T00:00:00Z";

/// One alert as sent to the Alertmanager receiver
///
/// Label and annotation maps are `BTreeMap` so repeated builds from the same
/// context serialize byte-identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAlert {
    /// Evaluation start time, RFC3339 UTC
    pub starts_at: String,
    /// Evaluation end time, or [`ENDS_AT_STILL_FIRING`] while alerting
    pub ends_at: String,
    /// URL of the rule that generated this alert
    #[serde(rename = "generatorURL", skip_serializing_if = "Option::is_none")]
    pub generator_url: Option<String>,
    /// `description` annotation when the rule carries a message
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Match tags plus the injected `alertname` label
    pub labels: BTreeMap<String, String>,
}

/// Build one wire alert per match in the evaluation context
///
/// Pure: no network or state side effects, deterministic for identical
/// inputs. The only fallible enrichment is the rule URL, which degrades by
/// omission.
pub fn build_payload(ctx: &EvalContext) -> Vec<WireAlert> {
    let starts_at = ctx
        .start_time
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let ends_at = if ctx.rule.state.is_alerting() {
        ENDS_AT_STILL_FIRING.to_string()
    } else {
        ctx.end_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    };

    let generator_url = ctx.rule_url().map(String::from);
    if generator_url.is_none() {
        tracing::warn!(
            rule_id = ctx.rule.id,
            rule = %ctx.rule.name,
            "rule URL unresolved, omitting generatorURL"
        );
    }

    let mut annotations = BTreeMap::new();
    if !ctx.rule.message.is_empty() {
        annotations.insert("description".to_string(), ctx.rule.message.clone());
    }

    ctx.matches
        .iter()
        .map(|m| {
            // Owned copy: mutating the result must never reach the match tags
            let mut labels: BTreeMap<String, String> = m
                .tags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            labels.insert("alertname".to_string(), ctx.rule.name.clone());

            WireAlert {
                starts_at: starts_at.clone(),
                ends_at: ends_at.clone(),
                generator_url: generator_url.clone(),
                annotations: annotations.clone(),
                labels,
            }
        })
        .collect()
}
