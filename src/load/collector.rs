use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::RunError;

use super::outcome::RequestOutcome;

/// Per-run sink for outcomes arriving from concurrently running tasks.
///
/// Arrival order is irrelevant; [`ResultCollector::finish`] orders by index.
#[derive(Debug, Default)]
pub struct ResultCollector {
    outcomes: Mutex<Vec<RequestOutcome>>,
}

impl ResultCollector {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn record(&self, outcome: RequestOutcome) {
        self.lock().push(outcome);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Closes the collector and returns the outcomes sorted by index.
    ///
    /// Taking `self` by value means every writer must already be gone.
    ///
    /// # Errors
    ///
    /// Returns an error unless the indices are exactly `1..=total`, each once.
    pub fn finish(self, total: u64) -> Result<Vec<RequestOutcome>, RunError> {
        let mut outcomes = self
            .outcomes
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        outcomes.sort_by_key(RequestOutcome::index);

        let mut expected: u64 = 1;
        for outcome in &outcomes {
            let index = outcome.index();
            if index == 0 || index > total {
                return Err(RunError::UnexpectedOutcome { index, total });
            }
            if index < expected {
                return Err(RunError::DuplicateOutcome { index });
            }
            if index > expected {
                return Err(RunError::MissingOutcome { index: expected });
            }
            expected = expected.saturating_add(1);
        }
        if expected <= total {
            return Err(RunError::MissingOutcome { index: expected });
        }

        Ok(outcomes)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RequestOutcome>> {
        // A writer that panicked mid-push leaves the vector intact.
        self.outcomes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
