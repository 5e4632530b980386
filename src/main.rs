use tracing::info;
use tracing_subscriber::EnvFilter;

use riskworks_api::server::{build_router, AppState};
use riskworks_api::{config, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("riskworks_api=info,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    info!("Starting RiskWorks API: {}", config.summary());

    let pool = database::connect(&config.database.url, config.database.max_connections).await?;
    if config.database.migrate_on_start {
        database::migrate(&pool).await?;
    }

    let state = AppState {
        pool,
        config: config.clone(),
    };
    let app = build_router(state);

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
