//! Alertmanager channel: settings, dispatch configuration, and the
//! delivery/poll loop

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::payload::build_payload;
use crate::eval::{AlertState, EvalContext};
use crate::state::AlertStateStore;
use crate::webhook::{AlertSender, DeliveryError, WebhookClient};

const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

/// Stored notification-channel record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel ID
    pub id: i64,
    /// Human-readable channel name
    pub name: String,
    /// Channel type, e.g. `alertmanager`
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether this channel is the org default
    #[serde(default)]
    pub is_default: bool,
    /// Channel-specific settings blob
    pub settings: serde_json::Value,
}

impl ChannelConfig {
    /// Create an alertmanager channel record
    pub fn new(id: i64, name: impl Into<String>, settings: serde_json::Value) -> Self {
        Self {
            id,
            name: name.into(),
            kind: "alertmanager".to_string(),
            is_default: false,
            settings,
        }
    }

    /// Mark this channel as the org default
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

/// Typed view of the alertmanager settings blob
#[derive(Debug, Deserialize)]
struct AlertmanagerSettings {
    #[serde(default)]
    url: String,
}

/// Process-level dispatch configuration, validated once at construction
///
/// The send timeout must be strictly shorter than the poll interval so a
/// delivery attempt can never outlive its iteration.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Sleep between loop iterations
    pub interval: Duration,
    /// Deadline for one delivery attempt
    pub send_timeout: Duration,
}

impl DispatchConfig {
    pub fn new(interval: Duration, send_timeout: Duration) -> Result<Self, ValidationError> {
        if interval.is_zero() {
            return Err(ValidationError::ZeroInterval);
        }
        if send_timeout.is_zero() {
            return Err(ValidationError::ZeroSendTimeout);
        }
        if send_timeout >= interval {
            return Err(ValidationError::SendTimeoutNotBelowInterval {
                send_timeout,
                interval,
            });
        }
        Ok(Self {
            interval,
            send_timeout,
        })
    }

    /// Create a dispatch config from environment variables
    /// ALERTMANAGER_TIMELOOP=30 (seconds, required)
    /// ALERTMANAGER_SEND_TIMEOUT=10 (seconds, optional)
    pub fn from_env() -> Result<Self, ValidationError> {
        let interval = std::env::var("ALERTMANAGER_TIMELOOP")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .ok_or(ValidationError::MissingInterval)?;

        let send_timeout = match std::env::var("ALERTMANAGER_SEND_TIMEOUT") {
            Ok(v) => v
                .parse::<u64>()
                .map_err(|_| ValidationError::InvalidSendTimeout(v))?,
            Err(_) => DEFAULT_SEND_TIMEOUT_SECS,
        };

        Self::new(
            Duration::from_secs(interval),
            Duration::from_secs(send_timeout),
        )
    }
}

/// Configuration errors raised at notifier construction
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Could not find url property in settings")]
    MissingUrl,

    #[error("Invalid settings payload: {0}")]
    InvalidSettings(String),

    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    #[error("Send timeout must be greater than zero")]
    ZeroSendTimeout,

    #[error("Send timeout {send_timeout:?} must be shorter than the poll interval {interval:?}")]
    SendTimeoutNotBelowInterval {
        send_timeout: Duration,
        interval: Duration,
    },

    #[error("ALERTMANAGER_TIMELOOP must be a positive integer number of seconds")]
    MissingInterval,

    #[error("ALERTMANAGER_SEND_TIMEOUT is not an integer number of seconds: {0}")]
    InvalidSendTimeout(String),
}

/// Notification channel delivering alert batches to an Alertmanager receiver
///
/// One [`notify`](Self::notify) call runs one complete notify cycle: it polls
/// the persisted alert state and re-delivers on the configured interval for
/// as long as the rule stays in the `Alerting` state.
pub struct AlertmanagerNotifier {
    id: i64,
    name: String,
    kind: String,
    is_default: bool,
    url: String,
    config: DispatchConfig,
    sender: Arc<dyn AlertSender>,
    store: Arc<dyn AlertStateStore>,
}

impl AlertmanagerNotifier {
    /// Create a notifier from a stored channel record
    ///
    /// Fails fast on an empty `url` setting; no network or state calls are
    /// made during construction.
    pub fn new(
        channel: &ChannelConfig,
        config: DispatchConfig,
        store: Arc<dyn AlertStateStore>,
    ) -> Result<Self, ValidationError> {
        let settings: AlertmanagerSettings = serde_json::from_value(channel.settings.clone())
            .map_err(|e| ValidationError::InvalidSettings(e.to_string()))?;

        if settings.url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }

        Ok(Self {
            id: channel.id,
            name: channel.name.clone(),
            kind: channel.kind.clone(),
            is_default: channel.is_default,
            url: settings.url,
            config,
            sender: Arc::new(WebhookClient::new()),
            store,
        })
    }

    /// Swap the delivery client (test seam / custom transport)
    pub fn with_sender(mut self, sender: Arc<dyn AlertSender>) -> Self {
        self.sender = sender;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Run one notify cycle for an evaluation context
    ///
    /// Loops while the local state is `Alerting`: build payload, deliver with
    /// the configured deadline, refresh state from the store, sleep, repeat.
    /// Terminal conditions:
    /// - local state leaves `Alerting` → `Ok(())`
    /// - delivery fails → persisted state is marked `Pending` best-effort and
    ///   the delivery error is returned
    /// - the state refresh fails → `Ok(())` (the batch was delivered; only
    ///   the bookkeeping could not be refreshed)
    pub async fn notify(&self, ctx: &EvalContext) -> Result<(), DeliveryError> {
        let mut state = ctx.rule.state;

        while state.is_alerting() {
            let alerts = build_payload(ctx);
            tracing::info!(
                notifier = %self.name,
                rule_id = ctx.rule.id,
                alerts = alerts.len(),
                "sending alert batch to alertmanager"
            );

            if let Err(err) = self
                .sender
                .send(&self.url, &alerts, self.config.send_timeout)
                .await
            {
                tracing::error!(
                    error = %err,
                    notifier = %self.name,
                    rule_id = ctx.rule.id,
                    "failed to send alert batch"
                );
                // Best-effort: a write failure is logged, the delivery error
                // is what propagates
                if let Err(write_err) = self
                    .store
                    .set_state(ctx.rule.id, ctx.rule.org_id, AlertState::Pending)
                    .await
                {
                    tracing::error!(
                        error = %write_err,
                        rule_id = ctx.rule.id,
                        "failed to mark alert pending"
                    );
                }
                return Err(err);
            }

            // The evaluator may have moved the rule on since our last write
            match self.store.get_state(ctx.rule.id).await {
                Ok(next) => state = next,
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        notifier = %self.name,
                        rule_id = ctx.rule.id,
                        "failed to refresh alert state, ending cycle"
                    );
                    return Ok(());
                }
            }

            tokio::time::sleep(self.config.interval).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalMatch, Rule};
    use crate::notify::WireAlert;
    use crate::state::StateStoreError;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    struct ScriptedSender {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ScriptedSender {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AlertSender for ScriptedSender {
        async fn send(
            &self,
            _base_url: &str,
            _alerts: &[WireAlert],
            _deadline: Duration,
        ) -> Result<(), DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DeliveryError::Status(502))
            } else {
                Ok(())
            }
        }
    }

    struct ScriptedStore {
        set_calls: Mutex<Vec<(i64, i64, AlertState)>>,
        fetches: Mutex<VecDeque<Result<AlertState, StateStoreError>>>,
        fail_writes: bool,
    }

    impl ScriptedStore {
        fn with_fetches(
            fetches: Vec<Result<AlertState, StateStoreError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                set_calls: Mutex::new(Vec::new()),
                fetches: Mutex::new(fetches.into()),
                fail_writes: false,
            })
        }

        fn failing_writes() -> Arc<Self> {
            Arc::new(Self {
                set_calls: Mutex::new(Vec::new()),
                fetches: Mutex::new(VecDeque::new()),
                fail_writes: true,
            })
        }

        fn set_calls(&self) -> Vec<(i64, i64, AlertState)> {
            self.set_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AlertStateStore for ScriptedStore {
        async fn set_state(
            &self,
            alert_id: i64,
            org_id: i64,
            state: AlertState,
        ) -> Result<(), StateStoreError> {
            self.set_calls.lock().unwrap().push((alert_id, org_id, state));
            if self.fail_writes {
                Err(StateStoreError::Backend("write refused".to_string()))
            } else {
                Ok(())
            }
        }

        async fn get_state(&self, alert_id: i64) -> Result<AlertState, StateStoreError> {
            self.fetches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(StateStoreError::NotFound(alert_id)))
        }
    }

    fn make_context(state: AlertState) -> EvalContext {
        let rule = Rule::new(42, 7, "High latency").with_state(state);
        let now = Utc::now();
        EvalContext::new(rule, now, now)
            .with_match(EvalMatch::new("latency_p99", 1250.0).with_tag("host", "web-1"))
    }

    fn make_notifier(
        sender: Arc<ScriptedSender>,
        store: Arc<ScriptedStore>,
    ) -> AlertmanagerNotifier {
        let channel = ChannelConfig::new(
            1,
            "am-main",
            serde_json::json!({"url": "http://localhost:9093"}),
        );
        let config =
            DispatchConfig::new(Duration::from_secs(5), Duration::from_secs(1)).unwrap();
        AlertmanagerNotifier::new(&channel, config, store)
            .unwrap()
            .with_sender(sender)
    }

    #[tokio::test]
    async fn test_not_alerting_returns_without_delivery() {
        let sender = ScriptedSender::ok();
        let store = ScriptedStore::with_fetches(vec![]);
        let notifier = make_notifier(Arc::clone(&sender), Arc::clone(&store));

        let result = notifier.notify(&make_context(AlertState::Ok)).await;

        assert!(result.is_ok());
        assert_eq!(sender.call_count(), 0);
        assert!(store.set_calls().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_marks_pending_and_returns_error() {
        let sender = ScriptedSender::failing();
        let store = ScriptedStore::with_fetches(vec![]);
        let notifier = make_notifier(Arc::clone(&sender), Arc::clone(&store));

        let result = notifier.notify(&make_context(AlertState::Alerting)).await;

        assert!(matches!(result, Err(DeliveryError::Status(502))));
        assert_eq!(sender.call_count(), 1);
        assert_eq!(store.set_calls(), vec![(42, 7, AlertState::Pending)]);
    }

    #[tokio::test]
    async fn test_pending_write_failure_preserves_delivery_error() {
        let sender = ScriptedSender::failing();
        let store = ScriptedStore::failing_writes();
        let notifier = make_notifier(Arc::clone(&sender), Arc::clone(&store));

        let result = notifier.notify(&make_context(AlertState::Alerting)).await;

        assert!(matches!(result, Err(DeliveryError::Status(502))));
        assert_eq!(store.set_calls(), vec![(42, 7, AlertState::Pending)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_cycle_when_state_clears() {
        let sender = ScriptedSender::ok();
        let store = ScriptedStore::with_fetches(vec![Ok(AlertState::Ok)]);
        let notifier = make_notifier(Arc::clone(&sender), Arc::clone(&store));

        let started = tokio::time::Instant::now();
        let result = notifier.notify(&make_context(AlertState::Alerting)).await;

        // One delivery, then the single bottom-of-iteration sleep before the
        // terminating check
        assert!(result.is_ok());
        assert_eq!(sender.call_count(), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert!(store.set_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loops_while_fetched_state_stays_alerting() {
        let sender = ScriptedSender::ok();
        let store = ScriptedStore::with_fetches(vec![
            Ok(AlertState::Alerting),
            Ok(AlertState::Ok),
        ]);
        let notifier = make_notifier(Arc::clone(&sender), Arc::clone(&store));

        let started = tokio::time::Instant::now();
        let result = notifier.notify(&make_context(AlertState::Alerting)).await;

        assert!(result.is_ok());
        assert_eq!(sender.call_count(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_ends_cycle_successfully() {
        let sender = ScriptedSender::ok();
        let store = ScriptedStore::with_fetches(vec![Err(StateStoreError::Backend(
            "bus unavailable".to_string(),
        ))]);
        let notifier = make_notifier(Arc::clone(&sender), Arc::clone(&store));

        let started = tokio::time::Instant::now();
        let result = notifier.notify(&make_context(AlertState::Alerting)).await;

        // Delivered once, no sleep: the cycle ends before the interval
        assert!(result.is_ok());
        assert_eq!(sender.call_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_against_memory_store() {
        let sender = ScriptedSender::ok();
        let store = Arc::new(crate::state::MemoryStateStore::new());
        // Another evaluator pass already resolved the rule
        store.set_state(42, 7, AlertState::Ok).await.unwrap();

        let channel = ChannelConfig::new(
            1,
            "am-main",
            serde_json::json!({"url": "http://localhost:9093"}),
        );
        let config =
            DispatchConfig::new(Duration::from_secs(5), Duration::from_secs(1)).unwrap();
        let notifier = AlertmanagerNotifier::new(
            &channel,
            config,
            Arc::clone(&store) as Arc<dyn AlertStateStore>,
        )
        .unwrap()
        .with_sender(Arc::clone(&sender) as Arc<dyn AlertSender>);

        let result = notifier.notify(&make_context(AlertState::Alerting)).await;

        assert!(result.is_ok());
        assert_eq!(sender.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_url_fails_validation() {
        let channel = ChannelConfig::new(1, "am-main", serde_json::json!({"url": ""}));
        let config =
            DispatchConfig::new(Duration::from_secs(5), Duration::from_secs(1)).unwrap();

        let result = AlertmanagerNotifier::new(
            &channel,
            config,
            ScriptedStore::with_fetches(vec![]),
        );
        assert!(matches!(result, Err(ValidationError::MissingUrl)));
    }

    #[tokio::test]
    async fn test_missing_url_key_fails_validation() {
        let channel = ChannelConfig::new(1, "am-main", serde_json::json!({}));
        let config =
            DispatchConfig::new(Duration::from_secs(5), Duration::from_secs(1)).unwrap();

        let result = AlertmanagerNotifier::new(
            &channel,
            config,
            ScriptedStore::with_fetches(vec![]),
        );
        assert!(matches!(result, Err(ValidationError::MissingUrl)));
    }

    #[test]
    fn test_dispatch_config_validation() {
        assert!(matches!(
            DispatchConfig::new(Duration::ZERO, Duration::from_secs(1)),
            Err(ValidationError::ZeroInterval)
        ));
        assert!(matches!(
            DispatchConfig::new(Duration::from_secs(5), Duration::ZERO),
            Err(ValidationError::ZeroSendTimeout)
        ));
        assert!(matches!(
            DispatchConfig::new(Duration::from_secs(5), Duration::from_secs(5)),
            Err(ValidationError::SendTimeoutNotBelowInterval { .. })
        ));

        let config =
            DispatchConfig::new(Duration::from_secs(30), Duration::from_secs(10)).unwrap();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.send_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_dispatch_config_from_env() {
        std::env::remove_var("ALERTMANAGER_TIMELOOP");
        std::env::remove_var("ALERTMANAGER_SEND_TIMEOUT");
        assert!(matches!(
            DispatchConfig::from_env(),
            Err(ValidationError::MissingInterval)
        ));

        std::env::set_var("ALERTMANAGER_TIMELOOP", "0");
        assert!(matches!(
            DispatchConfig::from_env(),
            Err(ValidationError::MissingInterval)
        ));

        std::env::set_var("ALERTMANAGER_TIMELOOP", "30");
        let config = DispatchConfig::from_env().unwrap();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.send_timeout, Duration::from_secs(10));

        std::env::set_var("ALERTMANAGER_SEND_TIMEOUT", "5");
        let config = DispatchConfig::from_env().unwrap();
        assert_eq!(config.send_timeout, Duration::from_secs(5));

        std::env::remove_var("ALERTMANAGER_TIMELOOP");
        std::env::remove_var("ALERTMANAGER_SEND_TIMEOUT");
    }
}
