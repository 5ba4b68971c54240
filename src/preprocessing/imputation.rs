//! Заполнение пропусков

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::outliers::group_values;
use super::traits::Transformer;
use crate::config::{CategoricalStrategy, ImputeStrategy};
use crate::data::frame::{floats, key_values, set_column, text_values};
use crate::error::{PipelineError, Result};

const MISSING_LABEL: &str = "Missing";

/// Заполняет пропуски числовой колонки средним или медианой
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanMedianImputer {
    variable: String,
    strategy: ImputeStrategy,
    statistic: Option<f64>,
}

impl MeanMedianImputer {
    pub fn new(variable: impl Into<String>, strategy: ImputeStrategy) -> Self {
        Self {
            variable: variable.into(),
            strategy,
            statistic: None,
        }
    }

    pub fn statistic(&self) -> Option<f64> {
        self.statistic
    }
}

impl Transformer for MeanMedianImputer {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        let values = floats(data, &self.variable)?;
        let statistic = match self.strategy {
            ImputeStrategy::Mean => values.mean(),
            ImputeStrategy::Median => values.median(),
        }
        .ok_or_else(|| {
            PipelineError::EmptyData(format!("no values to impute '{}' from", self.variable))
        })?;
        debug!(variable = %self.variable, statistic, "Imputer fitted");

        self.statistic = Some(statistic);
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        let statistic = self
            .statistic
            .ok_or(PipelineError::NotFitted("MeanMedianImputer"))?;

        let filled = floats(&data, &self.variable)?.fill_null_with_values(statistic)?;
        set_column(&mut data, filled.into_series())?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.statistic.is_some()
    }
}

/// Заполняет пропуски категориальной колонки самым частым значением
/// (при равенстве частот берётся наименьшее) или литералом "Missing"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalImputer {
    variable: String,
    strategy: CategoricalStrategy,
    fill_value: Option<String>,
}

impl CategoricalImputer {
    pub fn new(variable: impl Into<String>, strategy: CategoricalStrategy) -> Self {
        Self {
            variable: variable.into(),
            strategy,
            fill_value: None,
        }
    }

    pub fn fill_value(&self) -> Option<&str> {
        self.fill_value.as_deref()
    }
}

impl Transformer for CategoricalImputer {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        let values = text_values(data, &self.variable)?;

        let fill_value = match self.strategy {
            CategoricalStrategy::Missing => MISSING_LABEL.to_string(),
            CategoricalStrategy::Frequent => {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for v in values.iter().flatten() {
                    *counts.entry(v.as_str()).or_default() += 1;
                }
                // BTreeMap упорядочен, поэтому при равенстве побеждает меньшее значение
                let mut best: Option<(&str, usize)> = None;
                for (value, count) in counts {
                    if best.map_or(true, |(_, c)| count > c) {
                        best = Some((value, count));
                    }
                }
                best.map(|(v, _)| v.to_string()).ok_or_else(|| {
                    PipelineError::EmptyData(format!("no values to impute '{}' from", self.variable))
                })?
            }
        };
        debug!(variable = %self.variable, fill_value = %fill_value, "Imputer fitted");

        self.fill_value = Some(fill_value);
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        let fill_value = self
            .fill_value
            .as_ref()
            .ok_or(PipelineError::NotFitted("CategoricalImputer"))?;

        let filled: Vec<String> = text_values(&data, &self.variable)?
            .into_iter()
            .map(|v| v.unwrap_or_else(|| fill_value.clone()))
            .collect();
        set_column(&mut data, Series::new(self.variable.as_str().into(), filled))?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.fill_value.is_some()
    }
}

/// Медиана `variable` внутри каждой группы `group_var`.
///
/// Заполняются только пропуски. Если группа строки не встречалась при
/// обучении, значение остаётся пропуском (с предупреждением в лог).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMedianImputer {
    variable: String,
    group_var: String,
    medians: Option<BTreeMap<String, f64>>,
}

impl GroupMedianImputer {
    pub fn new(variable: impl Into<String>, group_var: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            group_var: group_var.into(),
            medians: None,
        }
    }

    pub fn medians(&self) -> Option<&BTreeMap<String, f64>> {
        self.medians.as_ref()
    }
}

impl Transformer for GroupMedianImputer {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        let medians: BTreeMap<String, f64> = group_values(data, &self.variable, &self.group_var)?
            .into_iter()
            .filter_map(|(group, values)| values.median().map(|m| (group, m)))
            .collect();
        debug!(variable = %self.variable, group_var = %self.group_var, ?medians, "Group medians fitted");

        self.medians = Some(medians);
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        let medians = self
            .medians
            .as_ref()
            .ok_or(PipelineError::NotFitted("GroupMedianImputer"))?;
        let groups = key_values(&data, &self.group_var)?;

        let mut unresolved = 0usize;
        let filled: Vec<Option<f64>> = floats(&data, &self.variable)?
            .into_iter()
            .zip(groups)
            .map(|(value, key)| {
                if value.is_some() {
                    return value;
                }
                let fill = key.and_then(|key| medians.get(&key).copied());
                if fill.is_none() {
                    unresolved += 1;
                }
                fill
            })
            .collect();

        if unresolved > 0 {
            warn!(
                variable = %self.variable,
                group_var = %self.group_var,
                count = unresolved,
                "Missing values left in place: group not seen during fit"
            );
        }

        set_column(&mut data, Series::new(self.variable.as_str().into(), filled))?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.medians.is_some()
    }
}
