//! Предсказания по сохранённым артефактам

use ndarray::Array1;
use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::config::{AppConfig, FeaturesConfig};
use crate::data::{load_pipeline, validate_data};
use crate::error::{PipelineError, Result};
use crate::models::SurvivalModel;
use crate::preprocessing::{FeaturePipeline, Transformer};
use crate::types::{Passenger, PredictionOutput};

/// Обученные пайплайн признаков и модель, загруженные один раз
#[derive(Debug, Clone)]
pub struct Predictor {
    features: FeaturesConfig,
    feature_pipeline: FeaturePipeline,
    model: SurvivalModel,
}

impl Predictor {
    pub fn new(features: FeaturesConfig, feature_pipeline: FeaturePipeline, model: SurvivalModel) -> Self {
        Self {
            features,
            feature_pipeline,
            model,
        }
    }

    pub fn load(config: &AppConfig) -> Result<Self> {
        let feature_pipeline = load_pipeline::<FeaturePipeline, _>(&config.paths.feature_pipeline)?.payload;
        let model = load_pipeline::<SurvivalModel, _>(&config.paths.model)?.payload;

        if !feature_pipeline.is_fitted() {
            return Err(PipelineError::NotFitted("FeaturePipeline"));
        }
        if !model.is_fitted() {
            return Err(PipelineError::NotFitted("SurvivalModel"));
        }
        info!(features = model.feature_names().len(), "Predictor loaded");

        Ok(Self::new(config.features.clone(), feature_pipeline, model))
    }

    pub fn feature_pipeline(&self) -> &FeaturePipeline {
        &self.feature_pipeline
    }

    pub fn model(&self) -> &SurvivalModel {
        &self.model
    }

    fn prepare(&self, data: DataFrame) -> Result<DataFrame> {
        if data.height() == 0 {
            return Err(PipelineError::EmptyData("no records to predict".to_string()));
        }
        let data = validate_data(&self.features, data)?;
        let transformed = self.feature_pipeline.transform(data)?;
        debug!(rows = transformed.height(), "Features prepared");
        Ok(transformed)
    }

    /// Метки 0/1 в порядке строк
    pub fn predict_frame(&self, data: DataFrame) -> Result<Array1<usize>> {
        self.model.predict(&self.prepare(data)?)
    }

    pub fn predict_proba_frame(&self, data: DataFrame) -> Result<Array1<f64>> {
        self.model.predict_proba(&self.prepare(data)?)
    }

    pub fn predict_passengers(&self, passengers: &[Passenger]) -> Result<Vec<PredictionOutput>> {
        let frame = Passenger::to_frame(passengers)?;
        let proba = self.predict_proba_frame(frame)?;

        Ok(passengers
            .iter()
            .zip(proba.iter())
            .map(|(p, &probability)| PredictionOutput {
                passenger_id: p.passenger_id,
                survived: u8::from(probability > 0.5),
                probability,
            })
            .collect())
    }

    /// Одна запись. Размер группы по билету в этом случае всегда 1.
    pub fn predict_one(&self, passenger: &Passenger) -> Result<PredictionOutput> {
        self.predict_passengers(std::slice::from_ref(passenger))?
            .pop()
            .ok_or_else(|| PipelineError::EmptyData("no prediction produced".to_string()))
    }
}
