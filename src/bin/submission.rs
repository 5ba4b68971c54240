/// Предсказания по test и запись файла посылки
///
/// Использование: submission [путь к конфигу]

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use titanic_ml::{run_submission, AppConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    let rows = run_submission(&config).context("submission failed")?;
    tracing::info!(rows, "Submission script completed successfully.");
    Ok(())
}
