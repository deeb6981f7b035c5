//! HTTP front door: `POST /api/test` runs one load test per request.
//!
//! A deliberately small HTTP/1.1 reader and writer on top of a tokio
//! listener; every connection carries exactly one request and is closed after
//! the response. Responses allow any origin so a browser UI served elsewhere
//! can call the API.
mod http;
mod routes;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::args::ServeArgs;
use crate::error::{AppError, AppResult, ServerError};
use crate::load::{HttpExecutor, LoadRunner};

pub struct ApiServer {
    listener: TcpListener,
    runner: LoadRunner,
}

impl ApiServer {
    /// Binds the listener. Port `0` picks a free port; see [`ApiServer::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound.
    pub async fn bind(addr: SocketAddr, runner: LoadRunner) -> AppResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| AppError::server(ServerError::Bind { addr, source: err }))?;
        Ok(Self { listener, runner })
    }

    /// # Errors
    ///
    /// Returns an error when the socket address cannot be read back.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        self.listener.local_addr().map_err(|err| {
            AppError::server(ServerError::Io {
                context: "read local address",
                source: err,
            })
        })
    }

    /// Accepts connections until `shutdown` resolves. Each connection is
    /// served on its own task, so concurrent load tests run side by side with
    /// their own limiter and collector.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept failures are logged and skipped.
    pub async fn run_until<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = self.local_addr() {
            info!("Listening on http://{}", addr);
        }
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutting down server");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        let runner = self.runner.clone();
                        tokio::spawn(async move {
                            routes::handle_connection(socket, peer, &runner).await;
                        });
                    }
                    Err(err) => {
                        warn!("Failed to accept connection: {}", err);
                    }
                },
            }
        }

        Ok(())
    }
}

/// Runs the API on `args.listen` until Ctrl-C.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built or the address
/// cannot be bound.
pub async fn serve(args: &ServeArgs) -> AppResult<()> {
    let runner = LoadRunner::new(HttpExecutor::new()?);
    let server = ApiServer::bind(args.listen, runner).await?;
    server.run_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
}
