use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing URL (set --url or provide in config).")]
    MissingUrl,
    #[error("URL must not be empty.")]
    EmptyUrl,
    #[error("Unsupported HTTP method '{value}'. Use GET, POST, PUT, or DELETE.")]
    UnsupportedMethod { value: String },
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("'{field}' must be a positive integer, got {value}.")]
    InvalidCount { field: &'static str, value: String },
    #[error("'{field}' is out of range for this platform.")]
    CountOutOfRange { field: &'static str },
    #[error("Invalid JSON payload: {source}")]
    InvalidPayload {
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to build runtime: {source}")]
    RuntimeBuildFailed {
        #[source]
        source: std::io::Error,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
