use std::time::Duration;

use serde::{Serialize, Serializer};

/// Status of one issued call: the HTTP status code, or the error sentinel when
/// no response was obtained at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Code(u16),
    Error,
}

impl OutcomeStatus {
    pub const ERROR_SENTINEL: &'static str = "ERROR";
}

impl Serialize for OutcomeStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            OutcomeStatus::Code(code) => serializer.serialize_u16(*code),
            OutcomeStatus::Error => serializer.serialize_str(Self::ERROR_SENTINEL),
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Code(code) => write!(f, "{}", code),
            OutcomeStatus::Error => f.write_str(Self::ERROR_SENTINEL),
        }
    }
}

/// Timed result of one issued call. Serializes as `{ i, status, timeTaken }`
/// or `{ i, status: "ERROR", error, timeTaken }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestOutcome {
    #[serde(rename = "i")]
    index: u64,
    status: OutcomeStatus,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(rename = "timeTaken")]
    elapsed_ms: u64,
}

impl RequestOutcome {
    /// A call that produced a response, whatever its status code.
    #[must_use]
    pub const fn response(index: u64, status: u16, elapsed_ms: u64) -> Self {
        Self {
            index,
            status: OutcomeStatus::Code(status),
            error_message: None,
            elapsed_ms,
        }
    }

    /// A call that never produced a status.
    #[must_use]
    pub fn transport_error(index: u64, message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            index,
            status: OutcomeStatus::Error,
            error_message: Some(message.into()),
            elapsed_ms,
        }
    }

    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub const fn status(&self) -> OutcomeStatus {
        self.status
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Only a literal 200 counts as success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Code(200)
    }
}

pub(crate) fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
