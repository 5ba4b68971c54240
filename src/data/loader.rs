//! Загрузка и сохранение данных и обученных артефактов

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

use super::frame::column_names;
use crate::error::{PipelineError, Result};

/// Значения, которые считаются пропуском при чтении CSV (пустое поле - тоже)
const MISSING_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null"];

/// Сериализованный обученный объект вместе с метаданными
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub payload: T,
}

fn check_file_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(PipelineError::InvalidPath(
            "path must be provided".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(PipelineError::InvalidPath(format!(
            "{} is a directory, not a file",
            path.display()
        )));
    }
    if path.exists() && !path.is_file() {
        return Err(PipelineError::InvalidPath(format!(
            "{} does not point to a regular file",
            path.display()
        )));
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Имена в заголовке должны быть уникальны: иначе одна колонка молча
/// заменила бы другую
fn check_unique_headers(path: &Path) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut seen = HashSet::new();
    let duplicates: BTreeSet<String> = headers
        .iter()
        .map(str::trim)
        .filter(|name| !seen.insert(*name))
        .map(str::to_string)
        .collect();
    if !duplicates.is_empty() {
        return Err(PipelineError::DuplicateColumns(duplicates.into_iter().collect()));
    }
    Ok(())
}

pub fn load_data<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    check_file_path(path)?;
    check_unique_headers(path)?;

    let null_values = MISSING_MARKERS.iter().map(|m| PlSmallStr::from(*m)).collect();
    let parse_options =
        CsvParseOptions::default().with_null_values(Some(NullValues::AllColumns(null_values)));

    let file = File::open(path)?;
    let data = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(file)
        .finish()?;

    debug!(
        path = %path.display(),
        rows = data.height(),
        columns = ?column_names(&data),
        "Data loaded"
    );
    Ok(data)
}

pub fn save_data<P: AsRef<Path>>(data: &DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    check_file_path(path)?;
    ensure_parent_dir(path)?;

    let mut file = File::create(path)?;
    let mut out = data.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut out)?;

    debug!(path = %path.display(), rows = data.height(), "Data saved");
    Ok(())
}

pub fn save_pipeline<T: Serialize, P: AsRef<Path>>(pipeline: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    check_file_path(path)?;
    ensure_parent_dir(path)?;

    let artifact = Artifact {
        created_at: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        payload: pipeline,
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &artifact)?;

    info!(path = %path.display(), "Artifact saved");
    Ok(())
}

pub fn load_pipeline<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Artifact<T>> {
    let path = path.as_ref();
    check_file_path(path)?;

    let reader = BufReader::new(File::open(path)?);
    let artifact: Artifact<T> = serde_json::from_reader(reader)?;

    info!(
        path = %path.display(),
        created_at = %artifact.created_at,
        version = %artifact.version,
        "Artifact loaded"
    );
    Ok(artifact)
}
