/// Работа с данными: колонки polars DataFrame, загрузка/сохранение, валидация

pub mod frame;
pub mod loader;
pub mod validator;

pub use frame::DType;
pub use loader::{load_data, load_pipeline, save_data, save_pipeline, Artifact};
pub use validator::validate_data;
