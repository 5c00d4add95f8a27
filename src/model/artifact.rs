//! The persisted output of a training run.

use crate::model::booster::{predict_proba, BoosterParams};
use crate::model::error::ModelError;
use crate::model::metrics::Evaluation;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::{DateTime, Utc};
use gbdt::gradient_boost::GBDT;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const DEFAULT_MODEL_PATH: &str = "models/precip_model.bin";

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// A fitted booster plus everything needed to score new rows with it.
#[derive(Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: GBDT,
    /// Feature columns in the order the booster expects them.
    pub feature_columns: Vec<String>,
    /// Precipitation threshold (mm/day) of the positive class.
    pub threshold: f64,
    pub training_rows: usize,
    /// Held-out metrics; absent when the model was refit on every row.
    pub evaluation: Option<Evaluation>,
    /// Mean cross-validated ROC AUC of the chosen parameters, for searched models.
    pub cv_roc_auc: Option<f64>,
    pub params: BoosterParams,
    pub trained_at: DateTime<Utc>,
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("feature_columns", &self.feature_columns)
            .field("threshold", &self.threshold)
            .field("training_rows", &self.training_rows)
            .field("evaluation", &self.evaluation)
            .field("cv_roc_auc", &self.cv_roc_auc)
            .field("params", &self.params)
            .field("trained_at", &self.trained_at)
            .finish_non_exhaustive()
    }
}

impl ModelArtifact {
    pub fn predict_proba(&self, rows: &[Vec<Option<f64>>]) -> Vec<f64> {
        predict_proba(&self.model, rows)
    }

    /// Writes the artifact to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ModelError::ArtifactIo(parent.to_path_buf(), e))?;
        }
        let bytes = bincode::serde::encode_to_vec(self, BINCODE_CONFIG)
            .map_err(|e| ModelError::ArtifactEncode(Box::from(e)))?;
        std::fs::write(path, &bytes).map_err(|e| ModelError::ArtifactIo(path.to_path_buf(), e))?;
        info!("Saved model ({} bytes) to {:?}", bytes.len(), path);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes =
            std::fs::read(path).map_err(|e| ModelError::ArtifactIo(path.to_path_buf(), e))?;
        let (artifact, _) = bincode::serde::decode_from_slice::<Self, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| ModelError::ArtifactDecode(path.to_path_buf(), Box::from(e)))?;
        Ok(artifact)
    }
}
