//! Кодирование категориальных признаков

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::traits::Transformer;
use crate::data::frame::{key_values, remove_column, series, set_column, text_values};
use crate::error::{PipelineError, Result};

/// Замена значений колонки по фиксированному словарю.
/// Значения вне словаря становятся пропусками.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalMapper {
    variable: String,
    mapping: BTreeMap<String, f64>,
    fitted: bool,
}

impl CategoricalMapper {
    pub fn new(variable: impl Into<String>, mapping: BTreeMap<String, f64>) -> Self {
        Self {
            variable: variable.into(),
            mapping,
            fitted: false,
        }
    }

    /// male -> 0, female -> 1
    pub fn sex() -> Self {
        let mapping = [("male", 0.0), ("female", 1.0)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        Self::new("Sex", mapping)
    }
}

impl Transformer for CategoricalMapper {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        series(data, &self.variable)?;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        if !self.fitted {
            return Err(PipelineError::NotFitted("CategoricalMapper"));
        }

        let mut unmapped = 0usize;
        let mapped: Vec<Option<f64>> = key_values(&data, &self.variable)?
            .into_iter()
            .map(|value| {
                let code = self.mapping.get(&value?).copied();
                if code.is_none() {
                    unmapped += 1;
                }
                code
            })
            .collect();

        if unmapped > 0 {
            warn!(variable = %self.variable, count = unmapped, "Unmapped values replaced with missing");
        }

        set_column(&mut data, Series::new(self.variable.as_str().into(), mapped))?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// One-hot с отбрасыванием первой (по алфавиту) категории.
///
/// Новые колонки `<variable>_<category>` добавляются в конец, исходная
/// колонка удаляется. Неизвестная на transform категория - ошибка.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    variable: String,
    categories: Option<Vec<String>>,
}

impl OneHotEncoder {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            categories: None,
        }
    }

    /// Имена выходных колонок (без базовой категории)
    pub fn output_columns(&self) -> Option<Vec<String>> {
        self.categories.as_ref().map(|cats| {
            cats.iter()
                .skip(1)
                .map(|c| format!("{}_{}", self.variable, c))
                .collect()
        })
    }
}

impl Transformer for OneHotEncoder {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        let values = key_values(data, &self.variable)?;
        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            return Err(PipelineError::MissingValues {
                column: self.variable.clone(),
                count: missing,
            });
        }

        let categories: BTreeSet<String> = values.into_iter().flatten().collect();
        debug!(variable = %self.variable, ?categories, "One-hot categories fitted");

        self.categories = Some(categories.into_iter().collect());
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        let categories = self
            .categories
            .as_ref()
            .ok_or(PipelineError::NotFitted("OneHotEncoder"))?;
        let keys = key_values(&data, &self.variable)?;
        let missing = keys.iter().filter(|v| v.is_none()).count();

        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let value = key.ok_or_else(|| PipelineError::MissingValues {
                column: self.variable.clone(),
                count: missing,
            })?;
            if !categories.contains(&value) {
                return Err(PipelineError::UnknownCategory {
                    column: self.variable.clone(),
                    value,
                });
            }
            values.push(value);
        }

        remove_column(&mut data, &self.variable)?;
        for category in categories.iter().skip(1) {
            let indicator: Vec<f64> = values
                .iter()
                .map(|v| if v == category { 1.0 } else { 0.0 })
                .collect();
            let name = format!("{}_{}", self.variable, category);
            set_column(&mut data, Series::new(name.into(), indicator))?;
        }
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.categories.is_some()
    }
}

/// Таблица приведения обращений к каноническим титулам
const TITLE_MAPPING: &[(&str, &str)] = &[
    ("Mr", "Mr"),
    ("Mrs", "Mrs"),
    ("Miss", "Miss"),
    ("Ms", "Miss"),
    ("Mlle", "Miss"),
    ("Master", "Master"),
    ("Dr", "Rare"),
    ("Rev", "Rare"),
    ("Col", "Rare"),
    ("Major", "Rare"),
    ("Capt", "Rare"),
    ("Sir", "Mr"),
    ("Lady", "Miss"),
    ("Don", "Rare"),
    ("the Countess", "Rare"),
    ("Jonkheer", "Rare"),
    ("Mme", "Mrs"),
    ("Dona", "Mrs"),
];

const RARE_TITLE: &str = "Rare";
const TITLE_PREFIX: &str = "Title";

/// Титул из имени вида "Фамилия, Титул. Имена".
/// Незнакомый титул относится к "Rare"; имя без такой структуры - None.
pub fn extract_title(name: &str) -> Option<&'static str> {
    let raw = name.split(',').nth(1)?.split('.').next()?.trim();
    if raw.is_empty() {
        return None;
    }
    let canonical = TITLE_MAPPING
        .iter()
        .find(|(title, _)| *title == raw)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(RARE_TITLE);
    Some(canonical)
}

/// Извлекает титул из `Name` и кодирует его one-hot (первая категория -
/// базовая). Набор выходных колонок фиксируется на fit и не зависит от
/// того, какие титулы встречаются в данных transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleExtractor {
    variable: String,
    dummies: Option<Vec<String>>,
}

impl TitleExtractor {
    pub fn new() -> Self {
        Self {
            variable: "Name".to_string(),
            dummies: None,
        }
    }

    /// Колонки, зафиксированные при обучении
    pub fn dummy_columns(&self) -> Option<Vec<String>> {
        self.dummies.as_ref().map(|titles| {
            titles
                .iter()
                .map(|t| format!("{}_{}", TITLE_PREFIX, t))
                .collect()
        })
    }

    fn titles(&self, data: &DataFrame) -> Result<Vec<Option<&'static str>>> {
        Ok(text_values(data, &self.variable)?
            .iter()
            .map(|name| name.as_deref().and_then(extract_title))
            .collect())
    }
}

impl Default for TitleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for TitleExtractor {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        let unique: BTreeSet<&str> = self.titles(data)?.into_iter().flatten().collect();
        let dummies: Vec<String> = unique.into_iter().skip(1).map(str::to_string).collect();
        debug!(?dummies, "Title columns fitted");

        self.dummies = Some(dummies);
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        let dummies = self
            .dummies
            .as_ref()
            .ok_or(PipelineError::NotFitted("TitleExtractor"))?;
        let titles = self.titles(&data)?;

        for title in dummies {
            let indicator: Vec<f64> = titles
                .iter()
                .map(|t| if *t == Some(title.as_str()) { 1.0 } else { 0.0 })
                .collect();
            let name = format!("{}_{}", TITLE_PREFIX, title);
            set_column(&mut data, Series::new(name.into(), indicator))?;
        }

        remove_column(&mut data, &self.variable)?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.dummies.is_some()
    }
}
