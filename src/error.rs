use crate::features::error::FeatureError;
use crate::model::error::ModelError;
use crate::power::error::FetchError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PowercastError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Failed to export feature table to '{0}'")]
    FeatureExport(PathBuf, #[source] PolarsError),

    #[error("I/O error for '{0}'")]
    Io(PathBuf, #[source] std::io::Error),
}
