use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

use super::defaults::default_listen_addr;
use super::parsers::{parse_payload, parse_positive_u64, parse_positive_usize};
use super::types::{HttpMethod, OutputFormat, PositiveU64, PositiveUsize};

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run one load test and print the report (default when no subcommand is given)
    Run(RunArgs),
    /// Serve the load-test API (POST /api/test) over HTTP
    Serve(ServeArgs),
}

#[derive(Debug, Parser, Clone)]
#[command(
    version,
    about = "Bounded-concurrency HTTP load generator - fire N requests at one endpoint, C at a time, and get per-request outcomes plus a latency summary.",
    args_conflicts_with_subcommands = true
)]
pub struct VolleyArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Target URL
    #[arg(long, short = 'u', env = "VOLLEY_URL")]
    pub url: Option<String>,

    /// HTTP method
    #[arg(
        long,
        short = 'X',
        value_enum,
        ignore_case = true,
        default_value = "get",
        env = "VOLLEY_METHOD"
    )]
    pub method: HttpMethod,

    /// JSON payload, sent as the body of POST and PUT requests only
    #[arg(long, short = 'd', value_parser = parse_payload, env = "VOLLEY_PAYLOAD")]
    pub payload: Option<serde_json::Value>,

    /// Value of the Authorization header (omitted when empty)
    #[arg(long = "auth-header", env = "VOLLEY_AUTH_HEADER")]
    pub auth_header: Option<String>,

    /// Total number of requests to issue
    #[arg(
        long,
        short = 'n',
        default_value = "10",
        value_parser = parse_positive_u64,
        env = "VOLLEY_REQUESTS"
    )]
    pub requests: PositiveU64,

    /// Maximum number of requests in flight at once
    #[arg(
        long,
        short = 'c',
        default_value = "5",
        value_parser = parse_positive_usize,
        env = "VOLLEY_CONCURRENCY"
    )]
    pub concurrency: PositiveUsize,

    /// Path to a TOML or JSON run file (defaults to ./volley.toml or ./volley.json)
    #[arg(long, env = "VOLLEY_CONFIG")]
    pub config: Option<String>,

    /// Report format printed to stdout
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "text",
        env = "VOLLEY_OUTPUT_FORMAT"
    )]
    pub output_format: OutputFormat,

    /// Also write the full JSON report to this path
    #[arg(long = "export-json", env = "VOLLEY_EXPORT_JSON")]
    pub export_json: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value_t = default_listen_addr(), env = "VOLLEY_LISTEN")]
    pub listen: SocketAddr,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
