/// API сервер для модели выживаемости

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use titanic_ml::{build_router, AppConfig, Predictor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    let predictor = Predictor::load(&config).context("failed to load trained artifacts")?;
    let app = build_router(Arc::new(predictor));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
