use crate::features::error::FeatureError;
use chrono::NaiveDate;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Not enough samples to train: {rows} labelled rows, at least {required} required")]
    InsufficientData { rows: usize, required: usize },

    #[error("No complete feature row for lon={lon} lat={lat} on {date}")]
    NoFeaturesAvailable { lon: f64, lat: f64, date: NaiveDate },

    #[error("Booster failed: {0}")]
    Booster(String),

    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error("Failed to read model inputs: {0}")]
    DataFrame(#[from] PolarsError),

    #[error("Failed to access model artifact '{0}'")]
    ArtifactIo(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode model artifact")]
    ArtifactEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to decode model artifact '{0}'")]
    ArtifactDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),
}
