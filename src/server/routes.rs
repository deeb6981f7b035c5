use std::net::SocketAddr;

use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::load::{LoadRunner, RunReport, TestRequest};

use super::http::{
    HttpRequest, RequestFailure, read_http_request, write_empty_response, write_error_response,
    write_json_response,
};

pub(super) const TEST_ROUTE: &str = "/api/test";

pub(super) async fn handle_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    runner: &LoadRunner,
) {
    let request = match read_http_request(&mut socket).await {
        Ok(request) => request,
        Err(failure) => {
            debug!("Rejected request from {}: {}", peer, failure.message);
            if write_error_response(&mut socket, failure.status, &failure.message)
                .await
                .is_err()
            {
                // Socket closed while writing error response.
            }
            return;
        }
    };

    if request.method == "OPTIONS" {
        if write_empty_response(&mut socket, 204).await.is_err() {
            // Socket closed while writing preflight response.
        }
        return;
    }

    match (request.method.as_str(), request.path.as_str()) {
        ("POST", TEST_ROUTE) => match run_test(&request, runner).await {
            Ok(report) => {
                if let Err(err) = write_json_response(&mut socket, 200, &report).await {
                    warn!("Failed to send report to {}: {}", peer, err);
                }
            }
            Err(failure) => {
                warn!("Rejected load test from {}: {}", peer, failure.message);
                if write_error_response(&mut socket, failure.status, &failure.message)
                    .await
                    .is_err()
                {
                    // Socket closed while writing error response.
                }
            }
        },
        (_, TEST_ROUTE) => {
            if write_error_response(&mut socket, 405, "Method not allowed")
                .await
                .is_err()
            {
                // Socket closed while writing error response.
            }
        }
        _ => {
            if write_error_response(&mut socket, 404, "Not found")
                .await
                .is_err()
            {
                // Socket closed while writing error response.
            }
        }
    }
}

/// Validates the body before anything is dispatched, then runs it to completion.
async fn run_test(
    request: &HttpRequest,
    runner: &LoadRunner,
) -> Result<RunReport, RequestFailure> {
    if request.body.is_empty() {
        return Err(RequestFailure::new(400, "Missing request body"));
    }
    let test_request: TestRequest = serde_json::from_slice(&request.body)
        .map_err(|err| RequestFailure::new(400, format!("Invalid JSON: {}", err)))?;
    let spec = test_request
        .into_spec()
        .map_err(|err| RequestFailure::new(400, err.to_string()))?;

    info!(
        "Load test requested: {} {} x{}",
        spec.method(),
        spec.url(),
        spec.total_requests()
    );
    runner
        .run(spec)
        .await
        .map_err(|err| RequestFailure::new(500, err.to_string()))
}
