//! Bounded retries with pluggable delay shapes and cancellation.
//!
//! - `policy.rs`: delay shapes and the named attempt budget
//! - `engine.rs`: the attempt loop
//! - `classify.rs`: HTTP status retryability

mod classify;
mod engine;
mod policy;

pub use classify::{RETRYABLE_STATUSES, StatusClass};
pub use engine::{Attempt, RetryEngine};
pub use policy::{DelayPolicy, PolicyBackoff, RetryPolicy};
