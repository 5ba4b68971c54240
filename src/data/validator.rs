//! Проверка входных данных перед пайплайном

use polars::prelude::*;
use tracing::{debug, error};

use super::frame::{cast_lossless, dtype_name, has_column, missing_count, series, set_column, DType};
use crate::config::FeaturesConfig;
use crate::error::{PipelineError, Result};

/// Проверяет наличие обязательных колонок и их типы.
///
/// Допустимые приведения (int64 -> float64, число -> object, полностью
/// пустая колонка -> любой тип) выполняются на месте. Пропуски в
/// обязательных колонках только логируются.
pub fn validate_data(features: &FeaturesConfig, mut data: DataFrame) -> Result<DataFrame> {
    let missing_columns: Vec<String> = features
        .input
        .iter()
        .filter(|c| !has_column(&data, c))
        .cloned()
        .collect();
    if !missing_columns.is_empty() {
        debug!(?missing_columns, "Missing columns in input data");
        return Err(PipelineError::MissingColumns(missing_columns));
    }

    for name in &features.input {
        let Some(&expected) = features.dtypes.get(name) else {
            continue;
        };

        let column = series(&data, name)?;
        let found = DType::of(column.dtype());
        match cast_lossless(column, expected)? {
            Some(cast) => {
                if found != Some(expected) {
                    debug!(column = %name, found = %dtype_name(column.dtype()), %expected, "Column cast to expected dtype");
                }
                set_column(&mut data, cast)?;
            }
            None => {
                return Err(PipelineError::DTypeMismatch {
                    column: name.clone(),
                    expected: expected.to_string(),
                    found: dtype_name(column.dtype()),
                });
            }
        }
    }

    let with_missing: Vec<(String, usize)> = features
        .input
        .iter()
        .filter_map(|name| {
            let count = missing_count(&data, name).ok()?;
            (count > 0).then(|| (name.clone(), count))
        })
        .collect();
    if !with_missing.is_empty() {
        error!(columns = ?with_missing, "Input data contains missing values.");
    }

    Ok(data)
}
