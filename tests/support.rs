use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

/// One request as the target server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// How the target server answers. `status_for` receives the 1-based arrival
/// number of the request.
#[derive(Clone, Copy)]
pub struct TargetBehavior {
    pub status_for: fn(u64) -> u16,
    pub delay: Duration,
}

impl Default for TargetBehavior {
    fn default() -> Self {
        Self {
            status_for: |_arrival| 200,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct TargetState {
    arrivals: AtomicU64,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    state: Arc<TargetState>,
}

impl ServerHandle {
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most connections the server was handling at the same moment.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a lightweight HTTP target for tests.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_http_server(behavior: TargetBehavior) -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let state = Arc::new(TargetState::default());
    let server_state = Arc::clone(&state);

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    let state = Arc::clone(&server_state);
                    thread::spawn(move || handle_client(stream, behavior, &state));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
            state,
        },
    ))
}

/// Like [`spawn_http_server`], but skips when the sandbox forbids sockets.
///
/// # Errors
///
/// Returns an error for any other bind failure.
pub fn spawn_http_server_or_skip(
    behavior: TargetBehavior,
) -> Result<Option<(String, ServerHandle)>, String> {
    match spawn_http_server(behavior) {
        Ok(result) => Ok(Some(result)),
        Err(err) if err.contains("Operation not permitted") => {
            eprintln!("Skipping e2e test: {}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// A URL on a port that was free a moment ago and now refuses connections.
///
/// # Errors
///
/// Returns an error if a port cannot be reserved.
pub fn unreachable_url() -> Result<String, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind probe failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("probe addr failed: {}", err))?;
    drop(listener);
    Ok(format!("http://{}/", addr))
}

fn handle_client(mut stream: TcpStream, behavior: TargetBehavior, state: &TargetState) {
    if stream.set_nonblocking(false).is_ok()
        && let Some(request) = read_request(&mut stream)
    {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        state.peak.fetch_max(now, Ordering::SeqCst);
        let arrival = state.arrivals.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        thread::sleep(behavior.delay);
        let status = (behavior.status_for)(arrival);
        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK",
            status
        );
        // Released before answering so the client never sees a stale count.
        state.in_flight.fetch_sub(1, Ordering::SeqCst);
        if stream.write_all(response.as_bytes()).is_ok() {
            drop(stream.flush());
        }
    }

    drop(stream.shutdown(Shutdown::Both));
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let bytes = stream.read(&mut chunk).ok()?;
        if bytes == 0 {
            return None;
        }
        buffer.extend_from_slice(chunk.get(..bytes)?);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(buffer.get(..header_end)?).into_owned();
    let mut lines = head.split("\r\n");
    let method = lines.next()?.split_whitespace().next()?.to_owned();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_owned()))
        .collect();
    let content_length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer.get(header_end.checked_add(4)?..)?.to_vec();
    while body.len() < content_length {
        let bytes = stream.read(&mut chunk).ok()?;
        if bytes == 0 {
            break;
        }
        body.extend_from_slice(chunk.get(..bytes)?);
    }
    body.truncate(content_length);

    Some(RecordedRequest {
        method,
        headers,
        body,
    })
}

/// Run the `volley` binary in `cwd` and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_volley<I, S>(cwd: &Path, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = volley_bin()?;
    Command::new(bin)
        .current_dir(cwd)
        .args(args)
        .env("VOLLEY_LOG", "error")
        .env_remove("VOLLEY_URL")
        .env_remove("VOLLEY_CONFIG")
        .output()
        .map_err(|err| format!("run volley failed: {}", err))
}

/// Runs `volley` with `--output-format json` and parses the report.
///
/// # Errors
///
/// Returns an error if the run fails or stdout is not a JSON report.
pub fn run_volley_json(cwd: &Path, args: &[&str]) -> Result<serde_json::Value, String> {
    let mut full_args: Vec<&str> = args.to_vec();
    full_args.extend(["--output-format", "json"]);
    let output = run_volley(cwd, &full_args)?;
    if !output.status.success() {
        return Err(describe_output(&output));
    }
    serde_json::from_slice(&output.stdout)
        .map_err(|err| format!("invalid report json: {}\n{}", err, describe_output(&output)))
}

#[must_use]
pub fn describe_output(output: &Output) -> String {
    format!(
        "status: {}\nstdout: {}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn volley_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_volley").map_or_else(
        || Err("CARGO_BIN_EXE_volley missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
