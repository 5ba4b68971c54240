//! Конфигурация пайплайна: колонки, пути, параметры предобработки и модели

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::data::DType;
use crate::error::{PipelineError, Result};

/// Переменная окружения с путём к конфигу
pub const CONFIG_ENV: &str = "TITANIC_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/titanic.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub features: FeaturesConfig,
    pub paths: PathsConfig,
    pub preprocessing: PreprocessingConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Обязательные входные колонки (в этом порядке подаются в пайплайн)
    pub input: Vec<String>,
    #[serde(default)]
    pub dtypes: BTreeMap<String, DType>,
    pub target: String,
    /// Колонки для StandardScaler
    pub numeric_features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub train: PathBuf,
    pub test: PathBuf,
    pub train_processed: PathBuf,
    pub submission: PathBuf,
    pub feature_pipeline: PathBuf,
    pub model: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputeStrategy {
    Mean,
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalStrategy {
    /// Самое частое значение
    Frequent,
    /// Литерал "Missing"
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    pub age_imputer_strategy: ImputeStrategy,
    pub embarked_imputer_strategy: CategoricalStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Доля признаков, рассматриваемых при каждом разбиении
    pub max_features: f64,
    pub subsample: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl AppConfig {
    /// Путь берётся из TITANIC_CONFIG, иначе config/titanic.toml
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.check()?;

        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.features.input.is_empty() {
            return Err(PipelineError::Config("features.input is empty".to_string()));
        }
        let model = &self.model;
        if model.n_estimators == 0 {
            return Err(PipelineError::Config("model.n_estimators must be > 0".to_string()));
        }
        if !(model.learning_rate > 0.0) {
            return Err(PipelineError::Config("model.learning_rate must be > 0".to_string()));
        }
        if !(model.subsample > 0.0 && model.subsample <= 1.0) {
            return Err(PipelineError::Config("model.subsample must be in (0, 1]".to_string()));
        }
        if !(model.max_features > 0.0 && model.max_features <= 1.0) {
            return Err(PipelineError::Config("model.max_features must be in (0, 1]".to_string()));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let input: Vec<String> = [
            "PassengerId",
            "Pclass",
            "Name",
            "Sex",
            "Age",
            "SibSp",
            "Parch",
            "Ticket",
            "Fare",
            "Cabin",
            "Embarked",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let dtypes = [
            ("PassengerId", DType::Int64),
            ("Pclass", DType::Int64),
            ("Name", DType::Object),
            ("Sex", DType::Object),
            ("Age", DType::Float64),
            ("SibSp", DType::Int64),
            ("Parch", DType::Int64),
            ("Ticket", DType::Object),
            ("Fare", DType::Float64),
            ("Cabin", DType::Object),
            ("Embarked", DType::Object),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();

        Self {
            features: FeaturesConfig {
                input,
                dtypes,
                target: "Survived".to_string(),
                numeric_features: vec![
                    "Age".to_string(),
                    "Fare".to_string(),
                    "TicketGroupSize".to_string(),
                ],
            },
            paths: PathsConfig {
                train: "data/train.csv".into(),
                test: "data/test.csv".into(),
                train_processed: "data/train_processed.csv".into(),
                submission: "data/submission.csv".into(),
                feature_pipeline: "artifacts/feature_pipeline.json".into(),
                model: "artifacts/model.json".into(),
            },
            preprocessing: PreprocessingConfig {
                age_imputer_strategy: ImputeStrategy::Median,
                embarked_imputer_strategy: CategoricalStrategy::Frequent,
            },
            model: ModelConfig {
                n_estimators: 200,
                learning_rate: 0.05,
                max_depth: 3,
                max_features: 0.8,
                subsample: 0.8,
                seed: 42,
            },
            server: ServerConfig::default(),
        }
    }
}
