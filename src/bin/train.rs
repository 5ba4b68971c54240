/// Обучение пайплайна признаков и модели
///
/// Использование: train [путь к конфигу]

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use titanic_ml::{train_pipeline, AppConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    let report = train_pipeline(&config).context("training failed")?;
    tracing::info!(
        samples = report.n_samples,
        features = report.features.len(),
        accuracy = report.accuracy,
        "Training pipeline executed successfully."
    );
    Ok(())
}
