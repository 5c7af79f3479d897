use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use dashboard::{
    config::Args,
    routes::{router, AppState},
    upstream::Upstream,
    Error,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if dotenvy::dotenv().is_err() {
        eprintln!("Unable to find .env file, relying on host environment...");
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let configuration = Args::parse().into_configuration()?;
    let upstream =
        Upstream::build(&configuration.upstream_url, configuration.fetch_timeout())?;
    let state = Arc::new(AppState::new(upstream));

    let url = configuration.bind_address();
    let listener = tokio::net::TcpListener::bind(&url)
        .await
        .map_err(|e| Error::from((format!("Unable to bind to {url}"), e)))?;
    info!("Now serving at http://{}", &url);
    info!("Refreshing experiments from {}", configuration.upstream_url);

    axum::serve(listener, router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::from(("Server error", e)))?;

    info!(
        "Shutting down, discarding {} experiments",
        state.store.len().await
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
