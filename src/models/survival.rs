//! Модель выживаемости поверх признаков пайплайна

use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use crate::data::frame::{column_names, to_array};
use crate::error::{PipelineError, Result};

/// Классификатор вместе с именами признаков, на которых он обучен.
/// Таблица с другим набором или порядком колонок отвергается.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalModel {
    feature_names: Vec<String>,
    classifier: GradientBoostingClassifier,
}

impl SurvivalModel {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            feature_names: Vec::new(),
            classifier: GradientBoostingClassifier::new(config),
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn classifier(&self) -> &GradientBoostingClassifier {
        &self.classifier
    }

    pub fn is_fitted(&self) -> bool {
        self.classifier.is_fitted()
    }

    pub fn fit(&mut self, features: &DataFrame, target: &Array1<f64>) -> Result<()> {
        let matrix = to_array(features)?;
        debug!(rows = matrix.nrows(), cols = matrix.ncols(), "Fitting survival model");

        self.classifier.fit(&matrix, target)?;
        self.feature_names = column_names(features);
        Ok(())
    }

    fn matrix(&self, features: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(PipelineError::NotFitted("SurvivalModel"));
        }
        let got = column_names(features);
        if got != self.feature_names {
            return Err(PipelineError::FeatureMismatch {
                expected: self.feature_names.clone(),
                got,
            });
        }
        to_array(features)
    }

    pub fn predict_proba(&self, features: &DataFrame) -> Result<Array1<f64>> {
        self.classifier.predict_proba(&self.matrix(features)?)
    }

    pub fn predict(&self, features: &DataFrame) -> Result<Array1<usize>> {
        self.classifier.predict(&self.matrix(features)?)
    }
}
