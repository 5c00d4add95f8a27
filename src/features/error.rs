use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Failed to build feature frame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
