//! Нормализация данных

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::Transformer;
use crate::data::frame::{floats, set_column};
use crate::error::{PipelineError, Result};

/// Стандартизация (x - mean) / std для перечисленных колонок.
/// Пропуски не участвуют в статистиках и остаются пропусками.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    variables: Vec<String>,
    mean: Option<Vec<f64>>,
    std: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new(variables: Vec<String>) -> Self {
        Self {
            variables,
            mean: None,
            std: None,
        }
    }

    pub fn mean(&self) -> Option<&[f64]> {
        self.mean.as_deref()
    }

    pub fn std(&self) -> Option<&[f64]> {
        self.std.as_deref()
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        let mut means = Vec::with_capacity(self.variables.len());
        let mut stds = Vec::with_capacity(self.variables.len());

        for name in &self.variables {
            let values = floats(data, name)?;
            let mean = values
                .mean()
                .ok_or_else(|| PipelineError::EmptyData(format!("no values to scale '{}'", name)))?;

            // Избегаем деления на ноль
            let mut std = values.std(0).unwrap_or_default();
            if std < 1e-10 {
                std = 1.0;
            }
            debug!(variable = %name, mean, std, "Scaler fitted");

            means.push(mean);
            stds.push(std);
        }

        self.mean = Some(means);
        self.std = Some(stds);
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err(PipelineError::NotFitted("StandardScaler")),
        };

        for (i, name) in self.variables.iter().enumerate() {
            let scaled: Vec<Option<f64>> = floats(&data, name)?
                .into_iter()
                .map(|v| v.map(|x| (x - mean[i]) / std[i]))
                .collect();
            set_column(&mut data, Series::new(name.as_str().into(), scaled))?;
        }
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.mean.is_some() && self.std.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::float_values;

    fn frame() -> DataFrame {
        df!(
            "Fare" => [Some(2.0), Some(4.0), Some(6.0), None],
            "Const" => [5i64, 5, 5, 5],
            "Sex" => [None::<&str>, None, None, None],
        )
        .unwrap()
    }

    #[test]
    fn test_scaler_population_std() {
        let mut scaler = StandardScaler::new(vec!["Fare".into()]);
        let out = scaler.fit_transform(frame()).unwrap();

        assert_eq!(scaler.mean().unwrap(), &[4.0]);
        let std = (8.0f64 / 3.0).sqrt();
        assert!((scaler.std().unwrap()[0] - std).abs() < 1e-12);

        let fares = float_values(&out, "Fare").unwrap();
        assert!((fares[0].unwrap() + 2.0 / std).abs() < 1e-12);
        assert_eq!(fares[1], Some(0.0));
        assert_eq!(fares[3], None);
    }

    #[test]
    fn test_constant_column_scale_is_one() {
        let mut scaler = StandardScaler::new(vec!["Const".into()]);
        let out = scaler.fit_transform(frame()).unwrap();
        assert_eq!(scaler.std().unwrap(), &[1.0]);
        assert!(float_values(&out, "Const")
            .unwrap()
            .iter()
            .all(|v| *v == Some(0.0)));
    }

    #[test]
    fn test_scaler_errors() {
        let mut scaler = StandardScaler::new(vec!["Sex".into()]);
        assert!(matches!(
            scaler.fit(&frame()),
            Err(PipelineError::DTypeMismatch { .. })
        ));

        let empty = df!("Age" => [None::<f64>]).unwrap();
        let mut scaler = StandardScaler::new(vec!["Age".into()]);
        assert!(matches!(scaler.fit(&empty), Err(PipelineError::EmptyData(_))));

        let unfitted = StandardScaler::new(vec!["Fare".into()]);
        assert!(!unfitted.is_fitted());
        assert!(unfitted.transform(frame()).is_err());
    }
}
