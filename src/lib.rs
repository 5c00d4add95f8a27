mod error;
mod features;
mod model;
mod patch;
mod power;
mod types;
mod utils;

pub use error::PowercastError;
pub use utils::{format_power_date, get_cache_dir, parse_power_date};

pub use types::feature_table::*;
pub use types::long_table::{LongTable, LONG_TABLE_COLUMNS};
pub use types::observation::{LocationKey, LonLat, Observation};

pub use power::cache::ResponseCache;
pub use power::client::*;
pub use power::error::FetchError;
pub use power::request::*;
pub use power::response::PowerResponse;
pub use power::retry::RetryPolicy;

pub use patch::assembler::*;
pub use patch::grid::grid_points;

pub use features::cyclical::encode_day_of_year;
pub use features::error::FeatureError;
pub use features::filtering::FeatureFrameExt;
pub use features::pipeline::{build_features, filter_complete};

pub use model::artifact::*;
pub use model::booster::BoosterParams;
pub use model::dataset::{feature_rows, Dataset, MODEL_FEATURES};
pub use model::error::ModelError;
pub use model::metrics::Evaluation;
pub use model::predictor::{Prediction, Predictor};
pub use model::search::{CandidateScore, Search, SearchConfig, SearchOutcome};
pub use model::trainer::{Trainer, TrainerConfig};
