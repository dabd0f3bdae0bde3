use anyhow::Context;
use db::DBService;
use server::{Deployment, app, config::Config};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    utils::logging::init("info");

    let db = DBService::new(&config.database_url)
        .await
        .context("failed to open database")?;
    let deployment = Deployment::new(db);

    let check = deployment.validator().validate().await?;
    if check.is_ok() {
        info!("{}", check.summary());
    } else {
        warn!("{}", check.summary());
    }

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!(addr = %listener.local_addr()?, "Livestock API listening");

    axum::serve(listener, app(deployment))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
