/// Типы данных: запись пассажира и ответы API

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Одна строка датасета Titanic. Имена полей совпадают с заголовком CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Passenger {
    pub passenger_id: i64,
    pub pclass: i64,
    pub name: String,
    pub sex: String,
    #[serde(default)]
    pub age: Option<f64>,
    pub sib_sp: i64,
    pub parch: i64,
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub fare: Option<f64>,
    #[serde(default)]
    pub cabin: Option<String>,
    #[serde(default)]
    pub embarked: Option<String>,
    /// Есть только в обучающих данных
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survived: Option<u8>,
}

impl Passenger {
    /// Собирает таблицу из записей, сохраняя их порядок
    pub fn to_frame(passengers: &[Passenger]) -> Result<DataFrame> {
        let ints = |name: &str, f: fn(&Passenger) -> i64| -> Column {
            let values: Vec<i64> = passengers.iter().map(f).collect();
            Series::new(name.into(), values).into()
        };
        let texts = |name: &str, f: fn(&Passenger) -> Option<String>| -> Column {
            let values: Vec<Option<String>> = passengers.iter().map(f).collect();
            Series::new(name.into(), values).into()
        };
        let floats = |name: &str, f: fn(&Passenger) -> Option<f64>| -> Column {
            let values: Vec<Option<f64>> = passengers.iter().map(f).collect();
            Series::new(name.into(), values).into()
        };

        let mut columns = vec![
            ints("PassengerId", |p| p.passenger_id),
            ints("Pclass", |p| p.pclass),
            texts("Name", |p| Some(p.name.clone())),
            texts("Sex", |p| Some(p.sex.clone())),
            floats("Age", |p| p.age),
            ints("SibSp", |p| p.sib_sp),
            ints("Parch", |p| p.parch),
            texts("Ticket", |p| p.ticket.clone()),
            floats("Fare", |p| p.fare),
            texts("Cabin", |p| p.cabin.clone()),
            texts("Embarked", |p| p.embarked.clone()),
        ];

        if !passengers.is_empty() && passengers.iter().all(|p| p.survived.is_some()) {
            columns.push(ints("Survived", |p| p.survived.map(i64::from).unwrap_or_default()));
        }

        Ok(DataFrame::new(columns)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub passenger_id: i64,
    pub survived: u8,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<PredictionOutput>,
}
