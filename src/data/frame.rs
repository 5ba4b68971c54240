//! Работа с колонками polars DataFrame: типы, выборка, замена, матрица признаков

use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, Result};

/// Тип колонки (имена совпадают с pandas, так их пишут в конфиге)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int64,
    Float64,
    Object,
}

impl DType {
    pub fn of(dtype: &DataType) -> Option<DType> {
        match dtype {
            DataType::Int64 => Some(DType::Int64),
            DataType::Float64 => Some(DType::Float64),
            DataType::String => Some(DType::Object),
            _ => None,
        }
    }

    pub fn to_polars(self) -> DataType {
        match self {
            DType::Int64 => DataType::Int64,
            DType::Float64 => DataType::Float64,
            DType::Object => DataType::String,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Int64 => "int64",
            DType::Float64 => "float64",
            DType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Имя типа для сообщений: как в конфиге, если тип там есть
pub fn dtype_name(dtype: &DataType) -> String {
    DType::of(dtype).map_or_else(|| dtype.to_string(), |d| d.to_string())
}

pub fn has_column(data: &DataFrame, name: &str) -> bool {
    data.get_column_index(name).is_some()
}

pub fn series<'a>(data: &'a DataFrame, name: &str) -> Result<&'a Series> {
    data.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))
}

pub fn column_names(data: &DataFrame) -> Vec<String> {
    data.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

pub fn missing_count(data: &DataFrame, name: &str) -> Result<usize> {
    Ok(series(data, name)?.null_count())
}

/// Числовая колонка, приведённая к float64
pub fn floats(data: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let s = series(data, name)?;
    let dtype = s.dtype();
    if !(dtype.is_primitive_numeric() || matches!(dtype, DataType::Null)) {
        return Err(PipelineError::DTypeMismatch {
            column: name.to_string(),
            expected: "numeric".to_string(),
            found: dtype_name(dtype),
        });
    }
    let cast = s.cast(&DataType::Float64)?;
    Ok(cast.f64()?.clone())
}

pub fn float_values(data: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let ca = floats(data, name)?;
    Ok(ca.into_iter().collect())
}

pub fn text_values(data: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let s = series(data, name)?;
    match s.dtype() {
        DataType::String => Ok(s
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()),
        DataType::Null => Ok(vec![None; s.len()]),
        other => Err(PipelineError::DTypeMismatch {
            column: name.to_string(),
            expected: DType::Object.to_string(),
            found: dtype_name(other),
        }),
    }
}

fn format_key(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Ключи групп: не зависят от того, int64 или float64 колонка
pub fn key_values(data: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if series(data, name)?.dtype().is_primitive_numeric() {
        Ok(float_values(data, name)?
            .into_iter()
            .map(|v| v.map(format_key))
            .collect())
    } else {
        text_values(data, name)
    }
}

/// Заменяет колонку с тем же именем на месте, иначе добавляет в конец
pub fn set_column(data: &mut DataFrame, column: Series) -> Result<()> {
    let got = column.len();
    if data.width() > 0 && got != data.height() {
        return Err(PipelineError::LengthMismatch {
            column: column.name().to_string(),
            expected: data.height(),
            got,
        });
    }
    data.with_column(column)?;
    Ok(())
}

pub fn remove_column(data: &mut DataFrame, name: &str) -> Result<Series> {
    data.drop_in_place(name)
        .map(|c| c.as_materialized_series().clone())
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))
}

pub fn drop_columns(data: &mut DataFrame, names: &[String]) -> Result<()> {
    for name in names {
        remove_column(data, name)?;
    }
    Ok(())
}

/// Колонки в заданном порядке; ошибка перечисляет все отсутствующие
pub fn select_columns(data: &DataFrame, names: &[String]) -> Result<DataFrame> {
    let missing: Vec<String> = names
        .iter()
        .filter(|n| !has_column(data, n))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }
    Ok(data.select(names.iter().map(String::as_str))?)
}

/// Приведение без потери информации. None, если приведение невозможно.
pub fn cast_lossless(column: &Series, target: DType) -> Result<Option<Series>> {
    let found = DType::of(column.dtype());
    if found == Some(target) {
        return Ok(Some(column.clone()));
    }
    if column.null_count() == column.len() {
        return Ok(Some(column.cast(&target.to_polars())?));
    }

    match (found, target) {
        (Some(DType::Int64), DType::Float64) | (Some(DType::Int64 | DType::Float64), DType::Object) => {
            Ok(Some(column.cast(&target.to_polars())?))
        }
        _ => Ok(None),
    }
}

/// Матрица признаков для модели: все колонки числовые, без пропусков
pub fn to_array(data: &DataFrame) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((data.height(), data.width()));

    for (j, name) in column_names(data).iter().enumerate() {
        let values = floats(data, name)?;
        let missing = values.null_count();
        if missing > 0 {
            return Err(PipelineError::MissingValues {
                column: name.clone(),
                count: missing,
            });
        }
        for (i, value) in values.into_iter().enumerate() {
            matrix[[i, j]] = value.unwrap_or_default();
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df!(
            "Pclass" => [1i64, 3],
            "Sex" => [Some("male"), None],
            "Age" => [Some(22.5), None],
        )
        .unwrap()
    }

    #[test]
    fn test_float_values_cast_integers() {
        let frame = sample_frame();
        assert_eq!(float_values(&frame, "Pclass").unwrap(), vec![Some(1.0), Some(3.0)]);
        assert!(matches!(
            float_values(&frame, "Sex"),
            Err(PipelineError::DTypeMismatch { .. })
        ));
        assert!(matches!(
            text_values(&frame, "Age"),
            Err(PipelineError::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_key_values_ignore_numeric_dtype() {
        let frame = df!("a" => [1i64, 2], "b" => [1.0, 2.5]).unwrap();
        assert_eq!(
            key_values(&frame, "a").unwrap(),
            key_values(&df!("a" => [1.0, 2.0]).unwrap(), "a").unwrap()
        );
        assert_eq!(key_values(&frame, "b").unwrap()[1].as_deref(), Some("2.5"));
    }

    #[test]
    fn test_set_column_replaces_in_place() {
        let mut frame = sample_frame();
        set_column(&mut frame, Series::new("Sex".into(), [0.0, 1.0])).unwrap();
        assert_eq!(column_names(&frame), vec!["Pclass", "Sex", "Age"]);
        assert_eq!(float_values(&frame, "Sex").unwrap(), vec![Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_set_column_rejects_wrong_length() {
        let mut frame = sample_frame();
        let err = set_column(&mut frame, Series::new("x".into(), [1.0])).unwrap_err();
        match err {
            PipelineError::LengthMismatch { column, expected, got } => {
                assert_eq!(column, "x");
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_reports_all_missing_columns() {
        let frame = sample_frame();
        let err = select_columns(&frame, &["Age".to_string(), "Fare".to_string(), "Name".to_string()])
            .unwrap_err();
        match err {
            PipelineError::MissingColumns(cols) => assert_eq!(cols, vec!["Fare", "Name"]),
            other => panic!("unexpected error: {other}"),
        }

        let reordered = select_columns(&frame, &["Age".to_string(), "Pclass".to_string()]).unwrap();
        assert_eq!(column_names(&reordered), vec!["Age", "Pclass"]);
    }

    #[test]
    fn test_to_array_rejects_missing_and_text() {
        let frame = sample_frame();
        assert!(to_array(&frame).is_err());

        let numeric = select_columns(&frame, &["Pclass".to_string()]).unwrap();
        let matrix = to_array(&numeric).unwrap();
        assert_eq!(matrix.shape(), &[2, 1]);
        assert_eq!(matrix[[1, 0]], 3.0);
    }

    #[test]
    fn test_cast_is_lossless_only() {
        let ints = Series::new("Ticket".into(), [113803i64, 17599]);
        let text = cast_lossless(&ints, DType::Object).unwrap().unwrap();
        assert_eq!(text.str().unwrap().get(0), Some("113803"));

        let floats = Series::new("Age".into(), [1.5]);
        assert!(cast_lossless(&floats, DType::Int64).unwrap().is_none());

        let words = Series::new("Name".into(), ["x"]);
        assert!(cast_lossless(&words, DType::Float64).unwrap().is_none());

        let empty = Series::new("Cabin".into(), [None::<f64>, None]);
        let cast = cast_lossless(&empty, DType::Object).unwrap().unwrap();
        assert_eq!(DType::of(cast.dtype()), Some(DType::Object));
    }
}
