//! Bounded-concurrency dispatch and result aggregation.
//!
//! A [`LoadRunner`] takes one validated [`RequestSpec`], issues
//! `total_requests` calls through a [`RequestExecutor`] while a
//! [`ConcurrencyLimiter`] keeps at most `concurrency` of them in flight,
//! gathers every [`RequestOutcome`] in a per-run [`ResultCollector`], and
//! reduces them into a [`Summary`].
mod collector;
mod executor;
mod limiter;
mod outcome;
mod runner;
mod spec;
mod summary;


pub use collector::ResultCollector;
pub use executor::{HttpExecutor, RequestExecutor};
pub use limiter::{ConcurrencyLimiter, SlotGuard};
pub use outcome::{OutcomeStatus, RequestOutcome};
pub use runner::{LoadRunner, RunReport};
pub use spec::{CountValue, RequestSpec, TestRequest};
pub use summary::Summary;
