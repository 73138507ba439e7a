use std::env;
use stub_api::{build_router, StubApp, StubState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn bind_addr() -> String {
    env::var("STUB_API_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stub_api=debug,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = StubState::new()
        .with_app(StubApp::new("web", "STARTED").aged_days(40))
        .with_app(StubApp::new("worker", "STARTED").aged_days(2))
        .with_app(StubApp::new("batch", "STOPPED").aged_days(90))
        .build_states(&["STAGING", "STAGING", "STAGED"])
        .restart_states(&["STARTING", "STARTED"]);

    let listener = TcpListener::bind(bind_addr()).await?;
    info!("stub api listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(state)).await
}
