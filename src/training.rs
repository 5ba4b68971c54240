//! Обучение: пайплайн признаков + модель, сохранение артефактов

use linfa::prelude::ToConfusionMatrix;
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::data::frame::{column_names, float_values, missing_count, select_columns};
use crate::data::{load_data, save_data, save_pipeline, validate_data};
use crate::error::{PipelineError, Result};
use crate::models::{GradientBoostingConfig, SurvivalModel};
use crate::preprocessing::{FeaturePipeline, Transformer};

/// Итог обучения (метрики на обучающей выборке)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_samples: usize,
    pub features: Vec<String>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Вектор меток из целевой колонки: только 0/1, без пропусков
pub fn extract_target(data: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let missing = missing_count(data, target)?;
    if missing > 0 {
        return Err(PipelineError::MissingValues {
            column: target.to_string(),
            count: missing,
        });
    }

    float_values(data, target)?
        .into_iter()
        .map(|v| match v {
            Some(t) if t == 0.0 || t == 1.0 => Ok(t),
            other => Err(PipelineError::InvalidTarget(format!(
                "'{}' must contain only 0 and 1, found {:?}",
                target, other
            ))),
        })
        .collect()
}

/// Обучает пайплайн признаков и модель без сохранения на диск
pub fn fit_pipeline(
    config: &AppConfig,
    raw: DataFrame,
) -> Result<(FeaturePipeline, SurvivalModel, DataFrame, TrainingReport)> {
    let raw = validate_data(&config.features, raw)?;
    let target = extract_target(&raw, &config.features.target)?;

    let mut feature_pipeline = FeaturePipeline::from_config(config);
    let features = feature_pipeline.fit_transform(select_columns(&raw, &config.features.input)?)?;
    debug!(
        rows = features.height(),
        columns = ?column_names(&features),
        "Feature pipeline finished"
    );

    info!("Model training started.");
    let mut model = SurvivalModel::new(GradientBoostingConfig::from(&config.model));
    model.fit(&features, &target)?;
    info!("Model training completed.");

    let report = evaluate(&model, &features, &target)?;
    Ok((feature_pipeline, model, features, report))
}

fn evaluate(model: &SurvivalModel, features: &DataFrame, target: &Array1<f64>) -> Result<TrainingReport> {
    let predicted = model.predict(features)?;
    let truth: Array1<usize> = target.mapv(|t| t as usize);

    let cm = predicted.confusion_matrix(truth.view())?;
    debug!("Confusion matrix: {:?}", cm);

    // метрики для положительного класса (выжил)
    let tp = predicted.iter().zip(truth.iter()).filter(|(p, t)| **p == 1 && **t == 1).count() as f64;
    let predicted_pos = predicted.iter().filter(|p| **p == 1).count() as f64;
    let actual_pos = truth.iter().filter(|t| **t == 1).count() as f64;
    let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };

    let report = TrainingReport {
        n_samples: features.height(),
        features: model.feature_names().to_vec(),
        accuracy: f64::from(cm.accuracy()),
        precision: ratio(tp, predicted_pos),
        recall: ratio(tp, actual_pos),
    };
    info!(
        accuracy = report.accuracy,
        precision = report.precision,
        recall = report.recall,
        "Training metrics"
    );
    Ok(report)
}

/// Полный цикл: чтение train, обучение, сохранение признаков и артефактов
pub fn train_pipeline(config: &AppConfig) -> Result<TrainingReport> {
    let paths = &config.paths;
    let raw = load_data(&paths.train)?;
    info!(path = %paths.train.display(), rows = raw.height(), "Training data loaded");

    let (feature_pipeline, model, features, report) = fit_pipeline(config, raw)?;

    save_data(&features, &paths.train_processed)?;
    save_pipeline(&feature_pipeline, &paths.feature_pipeline)?;
    save_pipeline(&model, &paths.model)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    #[test]
    fn test_extract_target() {
        let frame = df!("Survived" => [0i64, 1, 1]).unwrap();
        assert_eq!(extract_target(&frame, "Survived").unwrap().to_vec(), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_extract_target_errors() {
        let missing = df!("Survived" => [Some(0i64), None]).unwrap();
        assert!(matches!(
            extract_target(&missing, "Survived"),
            Err(PipelineError::MissingValues { .. })
        ));

        let invalid = df!("Survived" => [0i64, 3]).unwrap();
        assert!(matches!(
            extract_target(&invalid, "Survived"),
            Err(PipelineError::InvalidTarget(_))
        ));

        let absent = df!("Pclass" => [1i64]).unwrap();
        assert!(matches!(
            extract_target(&absent, "Survived"),
            Err(PipelineError::ColumnNotFound(_))
        ));
    }
}
