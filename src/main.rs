use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vibecheck::config::{Cli, Config};
use vibecheck::state::AppState;
use vibecheck::{api, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    let uploads_dir = config.uploads_path();
    std::fs::create_dir_all(&uploads_dir)?;
    tracing::info!("Uploads directory: {}", uploads_dir.display());

    if config.auth.trust_client_ids {
        tracing::warn!("auth.trust_client_ids is on: client-supplied user ids are not checked");
    }

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = api::router(AppState { db: pool, config });

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
