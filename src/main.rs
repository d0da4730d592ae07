use anyhow::Context;
use poultry_vet_chat::{api, config::Config, telemetry};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    let mut config = Config::load().context("Failed to load configuration")?;
    telemetry::init(&config.logging).context("Failed to initialize tracing")?;

    let addr = config.bind_addr()?;
    let state = api::init_app_state(&mut config)?;
    let app = api::build_router(state, &config.server, &config.cors);

    tracing::info!(
        "Hen feces chatbot API listening on {} (history window: {} turns)",
        addr,
        config.history.max_turns
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
