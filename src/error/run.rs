use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Run finished without an outcome for request {index}.")]
    MissingOutcome { index: u64 },
    #[error("Run recorded request {index} more than once.")]
    DuplicateOutcome { index: u64 },
    #[error("Run recorded request {index}, outside 1..={total}.")]
    UnexpectedOutcome { index: u64, total: u64 },
    #[error("Result collector was still shared when the run finished.")]
    CollectorStillShared,
}
