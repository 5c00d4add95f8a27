//! Single train/test fit of the precipitation classifier.

use crate::model::artifact::ModelArtifact;
use crate::model::booster::{predict_proba, BoosterParams};
use crate::model::dataset::{Dataset, MODEL_FEATURES};
use crate::model::error::ModelError;
use crate::model::metrics::{Evaluation, DEFAULT_CUTOFF};
use crate::types::feature_table::FeatureTable;
use chrono::Utc;
use log::{info, warn};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    /// Fewer labelled rows than this is an error.
    pub min_rows: usize,
    /// Share of each class held out for evaluation.
    pub test_fraction: f64,
    pub params: BoosterParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            min_rows: 20,
            test_fraction: 0.3,
            params: BoosterParams::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Splits `table`, fits on the training side and evaluates on the held-out side.
    ///
    /// # Errors
    ///
    /// [`ModelError::InsufficientData`] when the table has fewer labelled rows than
    /// `min_rows`.
    pub fn train(&self, table: &FeatureTable) -> Result<ModelArtifact, ModelError> {
        let dataset = Dataset::from_feature_table(table)?;
        if dataset.len() < self.config.min_rows {
            return Err(ModelError::InsufficientData {
                rows: dataset.len(),
                required: self.config.min_rows,
            });
        }
        info!(
            "Training on {} rows ({} positive) with threshold {}",
            dataset.len(),
            dataset.positives(),
            table.threshold
        );

        let (train_idx, test_idx) = dataset.stratified_split(self.config.test_fraction);
        let train = dataset.subset(&train_idx);
        let test = dataset.subset(&test_idx);
        let model = self.config.params.fit(&train)?;

        let evaluation = if test.is_empty() {
            warn!("Held-out split is empty, skipping evaluation");
            None
        } else {
            let probabilities = predict_proba(&model, &test.features);
            let evaluation = Evaluation::compute(&test.labels, &probabilities, DEFAULT_CUTOFF);
            info!("Held-out evaluation:\n{}", evaluation);
            Some(evaluation)
        };

        Ok(ModelArtifact {
            model,
            feature_columns: MODEL_FEATURES.iter().map(|c| c.to_string()).collect(),
            threshold: table.threshold,
            training_rows: train.len(),
            evaluation,
            cv_roc_auc: None,
            params: self.config.params,
            trained_at: Utc::now(),
        })
    }

    /// [`Trainer::train`], then saves the artifact at `path`.
    pub fn train_and_save(
        &self,
        table: &FeatureTable,
        path: &Path,
    ) -> Result<ModelArtifact, ModelError> {
        let artifact = self.train(table)?;
        artifact.save(path)?;
        Ok(artifact)
    }
}
