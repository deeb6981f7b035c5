use std::future::Future;
use std::net::SocketAddr;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use super::*;
use crate::load::{RequestExecutor, RequestOutcome, RequestSpec};

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

/// Answers odd indices with 200 and even ones with 503.
struct AlternatingExecutor;

#[async_trait]
impl RequestExecutor for AlternatingExecutor {
    async fn execute(&self, index: u64, _spec: &RequestSpec) -> RequestOutcome {
        let status = if index.checked_rem(2) == Some(1) { 200 } else { 503 };
        RequestOutcome::response(index, status, index.saturating_mul(10))
    }
}

async fn start_server() -> Result<(SocketAddr, oneshot::Sender<()>), String> {
    let bind_addr: SocketAddr = "127.0.0.1:0"
        .parse()
        .map_err(|err| format!("Invalid bind addr: {}", err))?;
    let server = ApiServer::bind(bind_addr, LoadRunner::new(AlternatingExecutor))
        .await
        .map_err(|err| format!("bind failed: {}", err))?;
    let addr = server
        .local_addr()
        .map_err(|err| format!("local_addr failed: {}", err))?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async {
            if shutdown_rx.await.is_err() {
                // Sender dropped; stop anyway.
            }
        };
        if let Err(err) = server.run_until(shutdown).await {
            tracing::warn!("Test server failed: {}", err);
        }
    });
    Ok((addr, shutdown_tx))
}

async fn post_test(addr: SocketAddr, body: String) -> Result<(u16, Value), String> {
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/test", addr))
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|err| format!("request failed: {}", err))?;
    let status = response.status().as_u16();
    let json: Value = response
        .json()
        .await
        .map_err(|err| format!("invalid response json: {}", err))?;
    Ok((status, json))
}

#[test]
fn post_runs_load_test_and_returns_report() -> Result<(), String> {
    run_async_test(async {
        let (addr, shutdown_tx) = start_server().await?;
        let body = json!({
            "url": "http://127.0.0.1:9/",
            "method": "GET",
            "totalRequests": 4,
            "concurrency": 2
        });
        let (status, json) = post_test(addr, body.to_string()).await?;
        drop(shutdown_tx.send(()));

        if status != 200 {
            return Err(format!("expected 200, got {} ({})", status, json));
        }
        let expected_summary = json!({
            "totalRequests": 4,
            "success": 2,
            "failed": 2,
            "averageTime": 25,
            "minTime": 10,
            "maxTime": 40
        });
        if json.get("summary") != Some(&expected_summary) {
            return Err(format!("unexpected summary: {}", json));
        }
        let statuses: Vec<Value> = json
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| "missing results".to_owned())?
            .iter()
            .filter_map(|entry| entry.get("status").cloned())
            .collect();
        if statuses != vec![json!(200), json!(503), json!(200), json!(503)] {
            return Err(format!("unexpected statuses: {:?}", statuses));
        }
        Ok(())
    })
}

#[test]
fn post_accepts_counts_as_strings() -> Result<(), String> {
    run_async_test(async {
        let (addr, shutdown_tx) = start_server().await?;
        let body = json!({
            "url": "http://127.0.0.1:9/",
            "method": "post",
            "payload": {"a": 1},
            "totalRequests": "3",
            "concurrency": "1"
        });
        let (status, json) = post_test(addr, body.to_string()).await?;
        drop(shutdown_tx.send(()));

        let total = json
            .get("summary")
            .and_then(|summary| summary.get("totalRequests"))
            .and_then(Value::as_u64);
        if status != 200 || total != Some(3) {
            return Err(format!("unexpected response {}: {}", status, json));
        }
        Ok(())
    })
}

#[test]
fn post_rejects_invalid_requests() -> Result<(), String> {
    run_async_test(async {
        let (addr, shutdown_tx) = start_server().await?;
        let cases = [
            ("{not json".to_owned(), "Invalid JSON"),
            (
                json!({"method": "GET", "totalRequests": 1, "concurrency": 1}).to_string(),
                "Missing URL",
            ),
            (
                json!({"url": "http://x/", "method": "PATCH", "totalRequests": 1, "concurrency": 1})
                    .to_string(),
                "Unsupported HTTP method",
            ),
            (
                json!({"url": "http://x/", "method": "GET", "totalRequests": 0, "concurrency": 1})
                    .to_string(),
                "totalRequests",
            ),
            (
                json!({
                    "url": "http://x/",
                    "method": "GET",
                    "totalRequests": 2,
                    "concurrency": "many"
                })
                .to_string(),
                "concurrency",
            ),
            (String::new(), "Missing request body"),
        ];

        let mut failures = Vec::new();
        for (body, expected) in cases {
            let (status, json) = post_test(addr, body.clone()).await?;
            let message = json.get("error").and_then(Value::as_str).unwrap_or_default();
            if status != 400 || !message.contains(expected) {
                failures.push(format!("{:?} -> {} {}", body, status, json));
            }
        }
        drop(shutdown_tx.send(()));

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("\n"))
        }
    })
}

#[test]
fn preflight_and_unknown_routes() -> Result<(), String> {
    run_async_test(async {
        let (addr, shutdown_tx) = start_server().await?;
        let client = reqwest::Client::new();

        let preflight = client
            .request(reqwest::Method::OPTIONS, format!("http://{}/api/test", addr))
            .send()
            .await
            .map_err(|err| format!("preflight failed: {}", err))?;
        if preflight.status().as_u16() != 204 {
            return Err(format!("expected 204, got {}", preflight.status()));
        }
        let origin = preflight
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok());
        if origin != Some("*") {
            return Err(format!("unexpected allow-origin {:?}", origin));
        }

        let wrong_method = client
            .get(format!("http://{}/api/test", addr))
            .send()
            .await
            .map_err(|err| format!("get failed: {}", err))?;
        if wrong_method.status().as_u16() != 405 {
            return Err(format!("expected 405, got {}", wrong_method.status()));
        }

        let missing = client
            .post(format!("http://{}/api/other", addr))
            .body("{}")
            .send()
            .await
            .map_err(|err| format!("post failed: {}", err))?;
        if missing.status().as_u16() != 404 {
            return Err(format!("expected 404, got {}", missing.status()));
        }

        drop(shutdown_tx.send(()));
        Ok(())
    })
}
