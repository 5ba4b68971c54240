//! Производные признаки: возрастная группа, семья на борту, размер группы по билету

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::traits::Transformer;
use crate::data::frame::{drop_columns, float_values, key_values, series, set_column};
use crate::error::{PipelineError, Result};

/// Левые границы возрастных корзин, последняя корзина закрыта справа
const AGE_EDGES: [f64; 6] = [0.0, 12.0, 18.0, 35.0, 60.0, 100.0];

/// Номер корзины 0..=4 для возраста: [0,12) [12,18) [18,35) [35,60) [60,100]
pub fn age_bucket(age: f64) -> Option<u8> {
    let last = AGE_EDGES[AGE_EDGES.len() - 1];
    if !(AGE_EDGES[0]..=last).contains(&age) {
        return None;
    }
    if age == last {
        return Some((AGE_EDGES.len() - 2) as u8);
    }
    AGE_EDGES
        .windows(2)
        .position(|w| age >= w[0] && age < w[1])
        .map(|idx| idx as u8)
}

/// `Age` -> `AgeGroup`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeGroupEncoder {
    variable: String,
    output: String,
    fitted: bool,
}

impl AgeGroupEncoder {
    pub fn new() -> Self {
        Self {
            variable: "Age".to_string(),
            output: "AgeGroup".to_string(),
            fitted: false,
        }
    }
}

impl Default for AgeGroupEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for AgeGroupEncoder {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        float_values(data, &self.variable)?;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        if !self.fitted {
            return Err(PipelineError::NotFitted("AgeGroupEncoder"));
        }
        let groups: Vec<Option<f64>> = float_values(&data, &self.variable)?
            .into_iter()
            .map(|age| age.and_then(age_bucket).map(f64::from))
            .collect();
        set_column(&mut data, Series::new(self.output.as_str().into(), groups))?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// `isfamilyonboard` = 1, если SibSp > 0 или Parch > 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyOnBoard {
    sibsp: String,
    parch: String,
    output: String,
    fitted: bool,
}

impl FamilyOnBoard {
    pub fn new() -> Self {
        Self {
            sibsp: "SibSp".to_string(),
            parch: "Parch".to_string(),
            output: "isfamilyonboard".to_string(),
            fitted: false,
        }
    }
}

impl Default for FamilyOnBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for FamilyOnBoard {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        float_values(data, &self.sibsp)?;
        float_values(data, &self.parch)?;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        if !self.fitted {
            return Err(PipelineError::NotFitted("FamilyOnBoard"));
        }
        let sibsp = float_values(&data, &self.sibsp)?;
        let parch = float_values(&data, &self.parch)?;

        // пропуск считается отсутствием родственников
        let flags: Vec<f64> = sibsp
            .iter()
            .zip(parch.iter())
            .map(|(s, p)| {
                let aboard = s.map_or(false, |s| s > 0.0) || p.map_or(false, |p| p > 0.0);
                if aboard { 1.0 } else { 0.0 }
            })
            .collect();
        set_column(&mut data, Series::new(self.output.as_str().into(), flags))?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// `TicketGroupSize`: сколько строк текущего набора имеют тот же билет.
///
/// Ничего не запоминает при обучении и пересчитывается по каждому
/// набору, поэтому на маленьком батче при предсказании значение может
/// быть меньше, чем на обучающей выборке.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCounter {
    variable: String,
    output: String,
    fitted: bool,
}

impl TicketCounter {
    pub fn new() -> Self {
        Self {
            variable: "Ticket".to_string(),
            output: "TicketGroupSize".to_string(),
            fitted: false,
        }
    }
}

impl Default for TicketCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for TicketCounter {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        series(data, &self.variable)?;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        if !self.fitted {
            return Err(PipelineError::NotFitted("TicketCounter"));
        }
        let keys = key_values(&data, &self.variable)?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for key in keys.iter().flatten() {
            *counts.entry(key.as_str()).or_default() += 1;
        }
        debug!(unique_tickets = counts.len(), "Ticket groups counted");

        let sizes: Vec<Option<f64>> = keys
            .iter()
            .map(|key| key.as_deref().and_then(|k| counts.get(k)).map(|c| *c as f64))
            .collect();
        set_column(&mut data, Series::new(self.output.as_str().into(), sizes))?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// Удаляет перечисленные колонки; отсутствие любой из них - ошибка
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropFeatures {
    features: Vec<String>,
    fitted: bool,
}

impl DropFeatures {
    pub fn new(features: Vec<String>) -> Self {
        Self {
            features,
            fitted: false,
        }
    }
}

impl Transformer for DropFeatures {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        for name in &self.features {
            series(data, name)?;
        }
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, mut data: DataFrame) -> Result<DataFrame> {
        if !self.fitted {
            return Err(PipelineError::NotFitted("DropFeatures"));
        }
        drop_columns(&mut data, &self.features)?;
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}
