//! Foghorn: Alertmanager notification channel
//!
//! A notification channel for alert-evaluation pipelines: given the outcome
//! of one alert rule evaluation, it delivers a wire-format alert batch to an
//! Alertmanager-style HTTP receiver and keeps a persisted alert-state record
//! synchronized with the delivery outcome.
//!
//! # Features
//!
//! - **Payload Builder**: pure evaluation-context → wire-alert translation
//! - **Delivery Client**: one timed POST per attempt to `/api/v1/alerts`
//! - **State Reconciler**: pending-on-failure writes, state refresh on success
//! - **Dispatch Loop**: polls and re-delivers while the rule stays alerting
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use foghorn::{
//!     AlertmanagerNotifier, AlertState, ChannelConfig, DispatchConfig, EvalContext,
//!     EvalMatch, MemoryStateStore, Rule,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = ChannelConfig::new(
//!     1,
//!     "am-main",
//!     serde_json::json!({"url": "http://localhost:9093"}),
//! );
//! let config = DispatchConfig::new(Duration::from_secs(30), Duration::from_secs(10))?;
//! let notifier = AlertmanagerNotifier::new(&channel, config, Arc::new(MemoryStateStore::new()))?;
//!
//! let rule = Rule::new(42, 1, "High latency")
//!     .with_message("p99 above threshold")
//!     .with_state(AlertState::Alerting);
//! let now = chrono::Utc::now();
//! let ctx = EvalContext::new(rule, now, now)
//!     .with_match(EvalMatch::new("latency_p99", 1250.0).with_tag("host", "web-1"));
//!
//! notifier.notify(&ctx).await?;
//! # Ok(())
//! # }
//! ```

pub mod eval;
pub mod notify;
pub mod state;
pub mod webhook;

// Re-export commonly used types
pub use eval::{AlertState, EvalContext, EvalMatch, Rule};
pub use notify::{
    build_payload, AlertmanagerNotifier, ChannelConfig, DispatchConfig, ValidationError,
    WireAlert,
};
pub use state::{AlertStateStore, MemoryStateStore, StateStoreError};
pub use webhook::{AlertSender, DeliveryError, WebhookClient};
