//! Core library for the `volley` CLI.
//!
//! `volley` fires a fixed number of HTTP requests at one endpoint while
//! keeping at most a configured number of them in flight, records the status
//! and latency of every call, and summarizes the run. The same engine backs
//! the one-shot `volley run` command and the `volley serve` JSON API.
pub mod args;
pub mod config;
pub mod entry;
pub mod error;
pub mod load;
pub mod logger;
pub mod output;
pub mod server;
