//! Пайплайн признаков: фиксированная последовательность шагов

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::encoding::{CategoricalMapper, OneHotEncoder, TitleExtractor};
use super::feature_engineering::{AgeGroupEncoder, DropFeatures, FamilyOnBoard, TicketCounter};
use super::imputation::{CategoricalImputer, GroupMedianImputer, MeanMedianImputer};
use super::normalization::StandardScaler;
use super::outliers::FareOutlierCapper;
use super::traits::Transformer;
use crate::config::AppConfig;
use crate::data::frame::{column_names, select_columns};
use crate::error::{PipelineError, Result};

/// Колонки, которые больше не нужны после построения производных признаков
const DROPPED_FEATURES: [&str; 5] = ["PassengerId", "Ticket", "Cabin", "SibSp", "Parch"];

/// Шаг пайплайна. Все варианты сериализуются в один артефакт.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    MeanMedianImputer(MeanMedianImputer),
    CategoricalImputer(CategoricalImputer),
    GroupMedianImputer(GroupMedianImputer),
    FareOutlierCapper(FareOutlierCapper),
    CategoricalMapper(CategoricalMapper),
    OneHotEncoder(OneHotEncoder),
    TitleExtractor(TitleExtractor),
    AgeGroupEncoder(AgeGroupEncoder),
    FamilyOnBoard(FamilyOnBoard),
    TicketCounter(TicketCounter),
    DropFeatures(DropFeatures),
    StandardScaler(StandardScaler),
}

impl Stage {
    fn inner(&self) -> &dyn Transformer {
        match self {
            Stage::MeanMedianImputer(t) => t,
            Stage::CategoricalImputer(t) => t,
            Stage::GroupMedianImputer(t) => t,
            Stage::FareOutlierCapper(t) => t,
            Stage::CategoricalMapper(t) => t,
            Stage::OneHotEncoder(t) => t,
            Stage::TitleExtractor(t) => t,
            Stage::AgeGroupEncoder(t) => t,
            Stage::FamilyOnBoard(t) => t,
            Stage::TicketCounter(t) => t,
            Stage::DropFeatures(t) => t,
            Stage::StandardScaler(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Transformer {
        match self {
            Stage::MeanMedianImputer(t) => t,
            Stage::CategoricalImputer(t) => t,
            Stage::GroupMedianImputer(t) => t,
            Stage::FareOutlierCapper(t) => t,
            Stage::CategoricalMapper(t) => t,
            Stage::OneHotEncoder(t) => t,
            Stage::TitleExtractor(t) => t,
            Stage::AgeGroupEncoder(t) => t,
            Stage::FamilyOnBoard(t) => t,
            Stage::TicketCounter(t) => t,
            Stage::DropFeatures(t) => t,
            Stage::StandardScaler(t) => t,
        }
    }
}

impl Transformer for Stage {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        self.inner_mut().fit(data)
    }

    fn transform(&self, data: DataFrame) -> Result<DataFrame> {
        self.inner().transform(data)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}

/// Обучаемая цепочка шагов предобработки.
///
/// Запоминает входные колонки при обучении и на transform берёт только
/// их (в том же порядке), так что лишние колонки, например целевая,
/// не попадают в признаки.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePipeline {
    steps: Vec<(String, Stage)>,
    feature_names_in: Option<Vec<String>>,
    feature_names_out: Option<Vec<String>>,
}

impl FeaturePipeline {
    pub fn new(steps: Vec<(String, Stage)>) -> Self {
        Self {
            steps,
            feature_names_in: None,
            feature_names_out: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let strategies = &config.preprocessing;
        let step = |name: &str, stage: Stage| (name.to_string(), stage);

        Self::new(vec![
            step(
                "age_imputer",
                Stage::MeanMedianImputer(MeanMedianImputer::new("Age", strategies.age_imputer_strategy)),
            ),
            step(
                "embarked_imputer",
                Stage::CategoricalImputer(CategoricalImputer::new(
                    "Embarked",
                    strategies.embarked_imputer_strategy,
                )),
            ),
            step(
                "fare_imputer",
                Stage::GroupMedianImputer(GroupMedianImputer::new("Fare", "Pclass")),
            ),
            step("fare_capping", Stage::FareOutlierCapper(FareOutlierCapper::default())),
            step("sex_encoder", Stage::CategoricalMapper(CategoricalMapper::sex())),
            step("embarked_encoder", Stage::OneHotEncoder(OneHotEncoder::new("Embarked"))),
            step("title_extractor", Stage::TitleExtractor(TitleExtractor::new())),
            step("age_group_feature", Stage::AgeGroupEncoder(AgeGroupEncoder::new())),
            step("isfamilyonboard_feature", Stage::FamilyOnBoard(FamilyOnBoard::new())),
            step("ticket_size_feature", Stage::TicketCounter(TicketCounter::new())),
            step(
                "drop_features",
                Stage::DropFeatures(DropFeatures::new(
                    DROPPED_FEATURES.iter().map(|s| s.to_string()).collect(),
                )),
            ),
            step(
                "scaling",
                Stage::StandardScaler(StandardScaler::new(config.features.numeric_features.clone())),
            ),
        ])
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn feature_names_in(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    pub fn feature_names_out(&self) -> Option<&[String]> {
        self.feature_names_out.as_deref()
    }

    fn run(&mut self, mut data: DataFrame) -> Result<DataFrame> {
        self.feature_names_in = Some(column_names(&data));
        for (name, stage) in self.steps.iter_mut() {
            data = stage.fit_transform(data)?;
            debug!(step = %name, rows = data.height(), cols = data.width(), "Step fitted");
        }
        self.feature_names_out = Some(column_names(&data));
        info!(
            steps = self.steps.len(),
            features = data.width(),
            "Feature pipeline fitted"
        );
        Ok(data)
    }
}

impl Transformer for FeaturePipeline {
    fn fit(&mut self, data: &DataFrame) -> Result<()> {
        self.run(data.clone())?;
        Ok(())
    }

    fn fit_transform(&mut self, data: DataFrame) -> Result<DataFrame> {
        self.run(data)
    }

    fn transform(&self, data: DataFrame) -> Result<DataFrame> {
        let (names_in, names_out) = match (&self.feature_names_in, &self.feature_names_out) {
            (Some(names_in), Some(names_out)) => (names_in, names_out),
            _ => return Err(PipelineError::NotFitted("FeaturePipeline")),
        };

        let mut data = select_columns(&data, names_in)?;
        for (_, stage) in &self.steps {
            data = stage.transform(data)?;
        }

        let got = column_names(&data);
        if &got != names_out {
            return Err(PipelineError::FeatureMismatch {
                expected: names_out.clone(),
                got,
            });
        }
        Ok(data)
    }

    fn is_fitted(&self) -> bool {
        self.feature_names_out.is_some() && self.steps.iter().all(|(_, s)| s.is_fitted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::{float_values, remove_column, to_array};
    use crate::types::Passenger;

    #[allow(clippy::too_many_arguments)]
    fn passenger(
        id: i64,
        pclass: i64,
        name: &str,
        sex: &str,
        age: Option<f64>,
        sib_sp: i64,
        parch: i64,
        ticket: &str,
        fare: Option<f64>,
        embarked: Option<&str>,
    ) -> Passenger {
        Passenger {
            passenger_id: id,
            pclass,
            name: name.to_string(),
            sex: sex.to_string(),
            age,
            sib_sp,
            parch,
            ticket: Some(ticket.to_string()),
            fare,
            cabin: None,
            embarked: embarked.map(str::to_string),
            survived: None,
        }
    }

    fn train_frame() -> DataFrame {
        let passengers = vec![
            passenger(1, 3, "Braund, Mr. Owen Harris", "male", Some(22.0), 1, 0, "A/5 21171", Some(7.25), Some("S")),
            passenger(2, 1, "Cumings, Mrs. John Bradley", "female", Some(38.0), 1, 0, "PC 17599", Some(71.2833), Some("C")),
            passenger(3, 3, "Heikkinen, Miss. Laina", "female", Some(26.0), 0, 0, "STON/O2. 3101282", Some(7.925), Some("S")),
            passenger(4, 1, "Futrelle, Mrs. Jacques Heath", "female", Some(35.0), 1, 0, "113803", Some(53.1), Some("S")),
            passenger(5, 3, "Allen, Mr. William Henry", "male", Some(35.0), 0, 0, "373450", Some(8.05), Some("S")),
            passenger(6, 3, "Moran, Mr. James", "male", None, 0, 0, "330877", Some(8.4583), Some("Q")),
            passenger(7, 1, "McCarthy, Mr. Timothy J", "male", Some(54.0), 0, 0, "17463", Some(51.8625), Some("S")),
            passenger(8, 3, "Palsson, Master. Gosta Leonard", "male", Some(2.0), 3, 1, "349909", Some(21.075), Some("S")),
            passenger(9, 2, "Nasser, Mrs. Nicholas", "female", Some(14.0), 1, 0, "237736", Some(30.0708), Some("C")),
            passenger(10, 2, "Uruchurtu, Don. Manuel E", "male", Some(40.0), 0, 0, "PC 17601", None, Some("C")),
            passenger(11, 2, "Hewlett, Mrs. Mary D", "female", Some(55.0), 0, 0, "248706", Some(16.0), None),
            passenger(12, 3, "Palsson, Miss. Torborg Danira", "female", Some(8.0), 3, 1, "349909", Some(21.075), Some("S")),
        ];
        Passenger::to_frame(&passengers).unwrap()
    }

    fn config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn test_step_order() {
        let pipeline = FeaturePipeline::from_config(&config());
        assert_eq!(
            pipeline.step_names(),
            vec![
                "age_imputer",
                "embarked_imputer",
                "fare_imputer",
                "fare_capping",
                "sex_encoder",
                "embarked_encoder",
                "title_extractor",
                "age_group_feature",
                "isfamilyonboard_feature",
                "ticket_size_feature",
                "drop_features",
                "scaling",
            ]
        );
    }

    #[test]
    fn test_fit_transform_output_columns() {
        let mut pipeline = FeaturePipeline::from_config(&config());
        let out = pipeline.fit_transform(train_frame()).unwrap();

        assert_eq!(
            column_names(&out),
            vec![
                "Pclass",
                "Sex",
                "Age",
                "Fare",
                "Embarked_Q",
                "Embarked_S",
                "Title_Miss",
                "Title_Mr",
                "Title_Mrs",
                "Title_Rare",
                "AgeGroup",
                "isfamilyonboard",
                "TicketGroupSize",
            ]
        );
        assert!(pipeline.is_fitted());
        assert_eq!(pipeline.feature_names_out().unwrap().len(), 13);
        // после пайплайна пропусков нет, модель примет матрицу
        assert!(to_array(&out).is_ok());
    }

    #[test]
    fn test_single_passenger_scenario() {
        let mut pipeline = FeaturePipeline::from_config(&config());
        pipeline.fit(&train_frame()).unwrap();

        let braund = passenger(
            892,
            2,
            "Braund, Mr. Owen Harris",
            "male",
            Some(22.3),
            1,
            0,
            "A/5 21171",
            Some(7.25),
            Some("S"),
        );
        let out = pipeline
            .transform(Passenger::to_frame(&[braund]).unwrap())
            .unwrap();

        let value = |name: &str| float_values(&out, name).unwrap();
        assert_eq!(value("Title_Mr"), vec![Some(1.0)]);
        assert_eq!(value("Title_Mrs"), vec![Some(0.0)]);
        assert_eq!(value("isfamilyonboard"), vec![Some(1.0)]);
        assert_eq!(value("AgeGroup"), vec![Some(2.0)]);
        assert_eq!(value("Sex"), vec![Some(0.0)]);
        assert_eq!(value("Embarked_S"), vec![Some(1.0)]);
        assert_eq!(value("TicketGroupSize").len(), 1);
    }

    #[test]
    fn test_title_columns_do_not_depend_on_batch() {
        let mut pipeline = FeaturePipeline::from_config(&config());
        let train_out = pipeline.fit_transform(train_frame()).unwrap();

        // в батче нет ни одного "Rare" и "Miss"
        let batch = vec![passenger(900, 3, "Kelly, Mr. James", "male", Some(34.5), 0, 0, "330911", Some(7.8292), Some("Q"))];
        let out = pipeline.transform(Passenger::to_frame(&batch).unwrap()).unwrap();
        assert_eq!(column_names(&out), column_names(&train_out));
        assert_eq!(float_values(&out, "Title_Rare").unwrap(), vec![Some(0.0)]);
    }

    #[test]
    fn test_ticket_group_size_is_batch_dependent() {
        let mut pipeline = FeaturePipeline::from_config(&config());
        pipeline.fit(&train_frame()).unwrap();

        let mate = |id| passenger(id, 3, "Andersson, Mr. Anders", "male", Some(39.0), 1, 5, "347082", Some(31.275), Some("S"));
        let three = pipeline
            .transform(Passenger::to_frame(&[mate(1), mate(2), mate(3)]).unwrap())
            .unwrap();
        let one = pipeline
            .transform(Passenger::to_frame(&[mate(1)]).unwrap())
            .unwrap();

        let sizes = float_values(&three, "TicketGroupSize").unwrap();
        assert!(sizes.iter().all(|s| *s == sizes[0]));
        assert_ne!(sizes[0], float_values(&one, "TicketGroupSize").unwrap()[0]);
    }

    #[test]
    fn test_transform_checks_input_columns() {
        let mut pipeline = FeaturePipeline::from_config(&config());
        pipeline.fit(&train_frame()).unwrap();

        let mut frame = train_frame();
        remove_column(&mut frame, "Cabin").unwrap();
        assert!(matches!(
            pipeline.transform(frame),
            Err(PipelineError::MissingColumns(_))
        ));

        let unfitted = FeaturePipeline::from_config(&config());
        assert!(matches!(
            unfitted.transform(train_frame()),
            Err(PipelineError::NotFitted(_))
        ));
    }

    #[test]
    fn test_unknown_embarked_category_fails() {
        let mut pipeline = FeaturePipeline::from_config(&config());
        pipeline.fit(&train_frame()).unwrap();

        let stranger = passenger(901, 1, "Doe, Mr. John", "male", Some(30.0), 0, 0, "X1", Some(30.0), Some("Z"));
        assert!(matches!(
            pipeline.transform(Passenger::to_frame(&[stranger]).unwrap()),
            Err(PipelineError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_serialized_pipeline_transforms_identically() {
        let mut pipeline = FeaturePipeline::from_config(&config());
        let expected = pipeline.fit_transform(train_frame()).unwrap();

        let json = serde_json::to_string(&pipeline).unwrap();
        let restored: FeaturePipeline = serde_json::from_str(&json).unwrap();
        assert!(restored.transform(train_frame()).unwrap().equals_missing(&expected));
    }
}
