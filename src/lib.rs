//! Titanic ML - пайплайн признаков и градиентный бустинг для предсказания выживаемости

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod predict;
pub mod preprocessing;
pub mod server;
pub mod submission;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use predict::Predictor;
pub use server::build_router;
pub use submission::{make_submission, run_submission};
pub use training::{fit_pipeline, train_pipeline, TrainingReport};
pub use types::*;
