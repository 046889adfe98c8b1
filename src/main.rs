use tracing_subscriber::EnvFilter;

use car_assistant::api;
use car_assistant::config::Config;
use car_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Catalog source: {}", config.csv_path.display());
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);

    let state = AppState::new(config.clone())?;
    tracing::info!(
        "Catalog loaded: {} records, {} manufacturers",
        state.catalog().len(),
        state.catalog().index().len()
    );

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
