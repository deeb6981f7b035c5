mod app;
mod config;
mod http;
mod run;
mod server;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use http::HttpError;
pub use run::RunError;
pub use server::ServerError;
pub use validation::ValidationError;
