use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Request};
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::args::HttpMethod;
use crate::error::{AppError, AppResult, HttpError};

use super::outcome::{RequestOutcome, duration_to_ms};
use super::spec::RequestSpec;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Performs one call for a given index and reports how it went.
///
/// Implementations must not fail past this boundary: every invocation yields
/// exactly one [`RequestOutcome`].
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, index: u64, spec: &RequestSpec) -> RequestOutcome;
}

/// [`RequestExecutor`] backed by a shared `reqwest` client.
///
/// The client is built without a request timeout: a call takes as long as the
/// target needs to settle.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    /// Builds an executor with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built (for example when
    /// the TLS backend fails to initialize).
    pub fn new() -> AppResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))?;
        Ok(Self::with_client(client))
    }

    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, index: u64, spec: &RequestSpec) -> RequestOutcome {
        let start = Instant::now();
        let result = match build_request(&self.client, spec) {
            Ok(request) => send_and_drain(&self.client, request).await,
            Err(message) => Err(message),
        };
        let elapsed_ms = duration_to_ms(start.elapsed());

        match result {
            Ok(status) => {
                debug!(
                    "Request {} {} {} -> {} in {}ms",
                    index,
                    spec.method(),
                    spec.url(),
                    status,
                    elapsed_ms
                );
                RequestOutcome::response(index, status, elapsed_ms)
            }
            Err(message) => {
                warn!("Request {} failed after {}ms: {}", index, elapsed_ms, message);
                RequestOutcome::transport_error(index, message, elapsed_ms)
            }
        }
    }
}

fn build_request(client: &Client, spec: &RequestSpec) -> Result<Request, String> {
    let url = Url::parse(spec.url())
        .map_err(|err| format!("Invalid URL '{}': {}", spec.url(), err))?;

    let mut request_builder = match spec.method() {
        HttpMethod::Get => client.get(url),
        HttpMethod::Post => client.post(url),
        HttpMethod::Put => client.put(url),
        HttpMethod::Delete => client.delete(url),
    };

    request_builder = request_builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE);
    if let Some(auth) = spec.auth_header() {
        request_builder = request_builder.header(AUTHORIZATION, auth);
    }
    if let Some(payload) = spec.body() {
        let body = serde_json::to_vec(payload)
            .map_err(|err| format!("Failed to encode payload: {}", err))?;
        request_builder = request_builder.body(body);
    }

    request_builder
        .build()
        .map_err(|err| describe_error(&err))
}

/// Sends the request and reads the body to the end, so the measured time
/// covers the full response. A body that breaks off midway still counts as a
/// response: the status was observed.
async fn send_and_drain(client: &Client, request: Request) -> Result<u16, String> {
    let response = client
        .execute(request)
        .await
        .map_err(|err| describe_error(&err))?;
    let status = response.status().as_u16();

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        if let Err(err) = chunk {
            debug!("Response body broke off: {}", describe_error(&err));
            break;
        }
    }
    Ok(status)
}

/// Renders an error with its whole `source()` chain, since `reqwest` keeps
/// the useful part ("Connection refused") in the innermost cause.
pub(crate) fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
