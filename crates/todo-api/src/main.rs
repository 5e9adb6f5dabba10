use std::net::SocketAddr;

use anyhow::Context;
use shared::Config;
use todo_api::{routes, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env().context("load configuration")?;
    let state = AppState::from_config(&config)
        .await
        .context("connect to database")?;
    let app = routes::app_with_state(state);

    let addr: SocketAddr = config.bind_addr.parse().context("parse BIND_ADDR")?;
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind tcp listener")?;
    axum::serve(listener, app).await.context("server shutdown")?;

    Ok(())
}
