//! Ограничение выбросов стоимости билета по классу

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::traits::Transformer;
use crate::data::frame::{float_values, key_values, set_column};
use crate::error::{PipelineError, Result};

/// Значения по группам; строки с пропуском значения или группы пропускаются
pub(crate) fn group_values(
    data: &DataFrame,
    variable: &str,
    group_var: &str,
) -> Result<BTreeMap<String, Float64Chunked>> {
    let values = float_values(data, variable)?;
    let groups = key_values(data, group_var)?;

    let mut by_group: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (value, key) in values.into_iter().zip(groups) {
        if let (Some(v), Some(key)) = (value, key) {
            by_group.entry(key).or_default().push(v);
        }
    }
    Ok(by_group
        .into_iter()
        .map(|(key, vals)| (key, Float64Chunked::from_vec(variable.into(), vals)))
        .collect())
}

/// Округление до 2 знаков, половины - к чётному
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareBounds {
    pub lower: f64,
    pub upper: f64,
}

/// Границы по IQR внутри каждого класса: [max(0, Q1 - 1.5*IQR), Q3 + 1.5*IQR].
/// Квартили округляются до 2 знаков до вычисления границ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareOutlierCapper {
    variable: String,
    group_var: String,
    bounds: Option<BTreeMap<String, FareBounds>>,
}

impl FareOutlierCapper {
    pub fn new(variable: impl Into<String>, group_var: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            group_var: group_var.into(),
            bounds: None,
        }
    }

    pub fn bounds(&self) -> Option<&BTreeMap<String, FareBounds>> {
        self.bounds.as_ref()
    }
}

impl Default for FareOutlierCapper {
    fn default() -> Self {
        Self::new("Fare", "Pclass")
    }
}

impl Transformer for FareOutlierCapper {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        let mut bounds = BTreeMap::new();
        for (group, fares) in group_values(data, &self.variable, &self.group_var)? {
            let (Some(q1), Some(q3)) = (
                fares.quantile(0.25, QuantileMethod::Linear)?,
                fares.quantile(0.75, QuantileMethod::Linear)?,
            ) else {
                continue;
            };
            let q1 = round2(q1);
            let q3 = round2(q3);
            let iqr = q3 - q1;
            let b = FareBounds {
                lower: (q1 - 1.5 * iqr).max(0.0),
                upper: q3 + 1.5 * iqr,
            };
            debug!(group = %group, lower = b.lower, upper = b.upper, "Fare bounds fitted");
            bounds.insert(group, b);
        }

        self.bounds = Some(bounds);
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        let bounds = self
            .bounds
            .as_ref()
            .ok_or(PipelineError::NotFitted("FareOutlierCapper"))?;
        let groups = key_values(&data, &self.group_var)?;

        let capped: Vec<Option<f64>> = float_values(&data, &self.variable)?
            .into_iter()
            .zip(groups)
            .map(|(value, key)| {
                let b = key.and_then(|key| bounds.get(&key));
                match (value, b) {
                    (Some(v), Some(b)) => Some(v.clamp(b.lower, b.upper)),
                    _ => value,
                }
            })
            .collect();

        set_column(&mut data, Series::new(self.variable.as_str().into(), capped))?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.bounds.is_some()
    }
}
