use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::store::{AlertStateStore, StateStoreError};
use crate::eval::AlertState;

/// One persisted alert-state record
#[derive(Debug, Clone)]
pub struct StoredAlertState {
    pub org_id: i64,
    pub state: AlertState,
    pub updated_at: DateTime<Utc>,
}

/// In-memory state store
///
/// Default store for embedders without an external persistence bus.
pub struct MemoryStateStore {
    /// Records indexed by alert ID
    records: DashMap<i64, StoredAlertState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Get the full record for an alert
    pub fn get(&self, alert_id: i64) -> Option<StoredAlertState> {
        self.records.get(&alert_id).map(|r| r.clone())
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertStateStore for MemoryStateStore {
    async fn set_state(
        &self,
        alert_id: i64,
        org_id: i64,
        state: AlertState,
    ) -> Result<(), StateStoreError> {
        self.records.insert(
            alert_id,
            StoredAlertState {
                org_id,
                state,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_state(&self, alert_id: i64) -> Result<AlertState, StateStoreError> {
        self.records
            .get(&alert_id)
            .map(|r| r.state)
            .ok_or(StateStoreError::NotFound(alert_id))
    }
}
