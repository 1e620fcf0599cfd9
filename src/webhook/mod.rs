//! Delivery transport for wire alerts

mod client;

pub use client::{AlertSender, DeliveryError, WebhookClient};
