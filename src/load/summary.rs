use serde::Serialize;

use super::outcome::RequestOutcome;

/// Aggregate statistics of a finished run, in whole milliseconds.
///
/// Serializes as `{ totalRequests, success, failed, averageTime, minTime, maxTime }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    #[serde(rename = "totalRequests")]
    pub total_requests: u64,
    #[serde(rename = "success")]
    pub success_count: u64,
    #[serde(rename = "failed")]
    pub failed_count: u64,
    #[serde(rename = "averageTime")]
    pub average_ms: u64,
    #[serde(rename = "minTime")]
    pub min_ms: u64,
    #[serde(rename = "maxTime")]
    pub max_ms: u64,
}

impl Summary {
    /// Reduces a closed outcome set in one pass.
    ///
    /// The average is the arithmetic mean rounded half-up. With no outcomes
    /// all latency fields are zero.
    #[must_use]
    pub fn from_outcomes(total_requests: u64, outcomes: &[RequestOutcome]) -> Self {
        let mut success_count: u64 = 0;
        let mut min_ms = u64::MAX;
        let mut max_ms: u64 = 0;
        let mut sum_ms: u128 = 0;

        for outcome in outcomes {
            if outcome.is_success() {
                success_count = success_count.saturating_add(1);
            }
            let elapsed = outcome.elapsed_ms();
            min_ms = min_ms.min(elapsed);
            max_ms = max_ms.max(elapsed);
            sum_ms = sum_ms.saturating_add(u128::from(elapsed));
        }

        let failed_count = total_requests.saturating_sub(success_count);
        let count = u128::try_from(outcomes.len()).unwrap_or(u128::MAX);
        if count == 0 {
            return Self {
                total_requests,
                success_count,
                failed_count,
                average_ms: 0,
                min_ms: 0,
                max_ms: 0,
            };
        }

        let average = sum_ms
            .saturating_add(count / 2)
            .checked_div(count)
            .unwrap_or(0);

        Self {
            total_requests,
            success_count,
            failed_count,
            average_ms: u64::try_from(average).unwrap_or(u64::MAX),
            min_ms,
            max_ms,
        }
    }
}
