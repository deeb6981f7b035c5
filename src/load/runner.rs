use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{error, info};

use crate::error::RunError;

use super::collector::ResultCollector;
use super::executor::RequestExecutor;
use super::limiter::ConcurrencyLimiter;
use super::outcome::{RequestOutcome, duration_to_ms};
use super::spec::RequestSpec;
use super::summary::Summary;

/// Upper bound on the outcome buffer reserved up front; larger runs grow it
/// as outcomes arrive.
const PREALLOCATED_OUTCOMES: usize = 4096;

/// Result of one run: `{ summary, results }` with results in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub summary: Summary,
    pub results: Vec<RequestOutcome>,
}

/// Drives one run at a time per call to [`LoadRunner::run`]. The executor is
/// shared; the limiter and collector are created fresh for every run.
#[derive(Clone)]
pub struct LoadRunner {
    executor: Arc<dyn RequestExecutor>,
}

impl LoadRunner {
    #[must_use]
    pub fn new<E>(executor: E) -> Self
    where
        E: RequestExecutor + 'static,
    {
        Self {
            executor: Arc::new(executor),
        }
    }

    #[must_use]
    pub fn from_shared(executor: Arc<dyn RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Issues `spec.total_requests()` calls, at most `spec.concurrency()` at a
    /// time, and waits for all of them to settle.
    ///
    /// A slot is taken before each task is spawned, so no more than
    /// `concurrency` request tasks exist at once however large the run is. A
    /// failed or panicking call never stops the others and is never retried.
    ///
    /// # Errors
    ///
    /// Returns an error only if the finished outcome set is incomplete.
    pub async fn run(&self, spec: RequestSpec) -> Result<RunReport, RunError> {
        let total = spec.total_requests();
        let limiter = ConcurrencyLimiter::new(spec.concurrency());
        let collector = Arc::new(ResultCollector::with_capacity(
            usize::try_from(total).map_or(PREALLOCATED_OUTCOMES, |count| {
                count.min(PREALLOCATED_OUTCOMES)
            }),
        ));
        let spec = Arc::new(spec);

        info!(
            "Starting run: {} {} x{} (concurrency {})",
            spec.method(),
            spec.url(),
            total,
            limiter.capacity()
        );
        let run_start = Instant::now();

        let mut tasks = JoinSet::new();
        for index in 1..=total {
            let slot = match limiter.acquire().await {
                Ok(slot) => slot,
                Err(err) => {
                    collector.record(RequestOutcome::transport_error(
                        index,
                        format!("Concurrency limiter unavailable: {}", err),
                        0,
                    ));
                    continue;
                }
            };
            let executor = Arc::clone(&self.executor);
            let collector = Arc::clone(&collector);
            let spec = Arc::clone(&spec);

            tasks.spawn(async move {
                let outcome = execute_guarded(executor.as_ref(), index, &spec).await;
                collector.record(outcome);
                drop(slot);
            });

            while let Some(joined) = tasks.try_join_next() {
                log_join_failure(&joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join_failure(&joined);
        }

        let collector =
            Arc::try_unwrap(collector).map_err(|_shared| RunError::CollectorStillShared)?;
        let results = collector.finish(total)?;
        let summary = Summary::from_outcomes(total, &results);

        info!(
            "Run finished in {}ms: {} ok, {} failed, avg {}ms (min {}ms, max {}ms)",
            duration_to_ms(run_start.elapsed()),
            summary.success_count,
            summary.failed_count,
            summary.average_ms,
            summary.min_ms,
            summary.max_ms
        );

        Ok(RunReport { summary, results })
    }
}

/// Runs one call and turns a panic inside the executor into an `ERROR`
/// outcome for that index.
async fn execute_guarded(
    executor: &dyn RequestExecutor,
    index: u64,
    spec: &RequestSpec,
) -> RequestOutcome {
    let start = Instant::now();
    match AssertUnwindSafe(executor.execute(index, spec))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Request {} panicked: {}", index, message);
            RequestOutcome::transport_error(
                index,
                format!("Request task panicked: {}", message),
                duration_to_ms(start.elapsed()),
            )
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

fn log_join_failure(joined: &Result<(), JoinError>) {
    if let Err(err) = joined {
        error!("Request task failed: {}", err);
    }
}
