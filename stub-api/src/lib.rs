//! In-memory stand-in for the parts of the v3 control-plane API that the
//! restage tool talks to.

pub mod handlers;
pub mod state;

pub use handlers::build_router;
pub use state::{StubApp, StubDroplet, StubState};

use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Serves `state` on an ephemeral localhost port in the background.
pub async fn spawn(state: StubState) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = build_router(state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("stub api stopped: {e}");
        }
    });

    Ok(addr)
}
