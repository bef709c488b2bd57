use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use chatbot_backend::core::config::ConfigService;
use chatbot_backend::core::logging;
use chatbot_backend::server;
use chatbot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_service = ConfigService::from_env();
    let config = config_service.load_config().with_context(|| {
        format!(
            "Failed to load configuration from {}",
            config_service.config_path().display()
        )
    })?;
    logging::init(&config.logging);
    tracing::info!(
        "Loaded configuration: {}",
        config_service.redacted(&config)
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::initialize(config).context("Failed to initialize application state")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
