//! Alert rule identity and state

use serde::{Deserialize, Serialize};

/// State of an alert rule as persisted between evaluation passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// Rule condition is firing
    Alerting,
    /// Rule fired but has not been delivered/acknowledged yet
    Pending,
    /// Rule condition is not firing
    Ok,
    /// Query backing the rule returned no data
    NoData,
    /// Rule evaluation is suspended
    Paused,
}

impl AlertState {
    /// Whether this state keeps a notify cycle running
    pub fn is_alerting(&self) -> bool {
        matches!(self, AlertState::Alerting)
    }
}

/// Identity of one alert rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule ID
    pub id: i64,
    /// Owning organization
    pub org_id: i64,
    /// Human-readable name, injected as the `alertname` label
    pub name: String,
    /// Optional message rendered into the `description` annotation
    #[serde(default)]
    pub message: String,
    /// State at the time the evaluation context was produced
    pub state: AlertState,
}

impl Rule {
    /// Create a new rule in the `Ok` state
    pub fn new(id: i64, org_id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            org_id,
            name: name.into(),
            message: String::new(),
            state: AlertState::Ok,
        }
    }

    /// Set the rule message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the rule state
    pub fn with_state(mut self, state: AlertState) -> Self {
        self.state = state;
        self
    }
}
