//! The Alertmanager notification channel

mod alertmanager;
mod payload;

pub use alertmanager::{
    AlertmanagerNotifier, ChannelConfig, DispatchConfig, ValidationError,
};
pub use payload::{build_payload, WireAlert, ENDS_AT_STILL_FIRING};
