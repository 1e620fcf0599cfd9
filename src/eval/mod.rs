//! Evaluation-context types produced by the alert rule evaluator
//!
//! The evaluator owns these values; the notifier borrows an [`EvalContext`]
//! for the duration of one notify cycle and keeps no copies afterward.

mod context;
mod rule;

pub use context::{EvalContext, EvalMatch};
pub use rule::{AlertState, Rule};
