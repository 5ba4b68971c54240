//! Файл посылки: PassengerId,Survived в порядке входных строк

use polars::prelude::*;
use tracing::info;

use crate::config::AppConfig;
use crate::data::frame::series;
use crate::data::{load_data, save_data};
use crate::error::Result;
use crate::predict::Predictor;

pub fn make_submission(predictor: &Predictor, data: DataFrame) -> Result<DataFrame> {
    let ids = series(&data, "PassengerId")?.clone();
    let labels = predictor.predict_frame(data)?;
    let survived: Vec<i64> = labels.iter().map(|&l| l as i64).collect();

    Ok(DataFrame::new(vec![
        ids.into(),
        Series::new("Survived".into(), survived).into(),
    ])?)
}

/// Читает test, предсказывает и пишет файл посылки. Возвращает число строк.
pub fn run_submission(config: &AppConfig) -> Result<usize> {
    let predictor = Predictor::load(config)?;
    let data = load_data(&config.paths.test)?;

    let submission = make_submission(&predictor, data)?;
    save_data(&submission, &config.paths.submission)?;

    info!(
        path = %config.paths.submission.display(),
        rows = submission.height(),
        "Predictions saved"
    );
    Ok(submission.height())
}
