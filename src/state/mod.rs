//! Persisted alert-state boundary
//!
//! The state store is shared with the evaluator: the notifier must tolerate
//! the fetched state differing from the state it last wrote.

mod memory;
mod store;

pub use memory::{MemoryStateStore, StoredAlertState};
pub use store::{AlertStateStore, StateStoreError};
