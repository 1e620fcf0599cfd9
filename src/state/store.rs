use async_trait::async_trait;

use crate::eval::AlertState;

/// Durable store for alert state, keyed by alert ID
///
/// Implementations own their concurrency control; callers never assume
/// exclusive access.
#[async_trait]
pub trait AlertStateStore: Send + Sync {
    /// Write the state for an alert
    async fn set_state(
        &self,
        alert_id: i64,
        org_id: i64,
        state: AlertState,
    ) -> Result<(), StateStoreError>;

    /// Read the current state for an alert
    async fn get_state(&self, alert_id: i64) -> Result<AlertState, StateStoreError>;
}

/// State store errors
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("Alert {0} not found")]
    NotFound(i64),

    #[error("Store backend error: {0}")]
    Backend(String),
}
