//! AudioSocket server
//!
//! Accepts PBX connections, runs one [`session::CallSession`] per call, and
//! exposes a small HTTP surface for health and Prometheus metrics.

pub mod http;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use registry::SessionRegistry;
pub use session::CallSession;
pub use state::AppState;

use thiserror::Error;
use tokio::net::TcpListener;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("session error: {0}")]
    Session(String),

    #[error("call setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Dialog(#[from] dhvani_dialog::DialogError),

    #[error(transparent)]
    Transport(#[from] dhvani_transport::TransportError),

    #[error(transparent)]
    Core(#[from] dhvani_core::Error),
}

/// Accept loop: one spawned [`CallSession`] per connection.
///
/// Runs until the listener errors or the task is cancelled from outside.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepted connection");

        let state = state.clone();
        tokio::spawn(async move {
            CallSession::run(stream, state).await;
        });
    }
}
