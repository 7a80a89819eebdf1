//! HTTP surface of the relay.
//!
//! Mounts the event stream handler and a health route on an axum `Router`,
//! and owns the server bootstrap. Everything broadcast related is delegated to
//! the `sse` crate.

use log::*;
use service::config::Config;
use sse::Broker;
use std::future::Future;
use tokio::net::TcpListener;

mod controller;
pub mod error;
mod extractors;
mod params;
pub mod router;
mod stream;

pub use error::{Error, Result};

// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub broker: Broker,
}

impl AppState {
    pub fn new(config: Config, broker: Broker) -> Self {
        Self { config, broker }
    }
}

/// Bind the configured interface and port and serve until `shutdown` resolves.
///
/// Graceful shutdown waits for open event streams; they end once the broker
/// has been shut down.
pub async fn init_server<F>(app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let host = app_state.config.interface().to_string();
    let port = app_state.config.port;
    let stream_path = app_state.config.stream_path().to_string();

    let router = router::define_routes(app_state)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    info!("Server starting... streaming events on http://{host}:{port}{stream_path}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
