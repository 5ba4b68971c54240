/// Модуль предобработки данных

pub mod encoding;
pub mod feature_engineering;
pub mod imputation;
pub mod normalization;
pub mod outliers;
pub mod pipeline;
pub mod traits;

pub use encoding::{extract_title, CategoricalMapper, OneHotEncoder, TitleExtractor};
pub use feature_engineering::{age_bucket, AgeGroupEncoder, DropFeatures, FamilyOnBoard, TicketCounter};
pub use imputation::{CategoricalImputer, GroupMedianImputer, MeanMedianImputer};
pub use normalization::StandardScaler;
pub use outliers::{FareBounds, FareOutlierCapper};
pub use pipeline::{FeaturePipeline, Stage};
pub use traits::Transformer;
