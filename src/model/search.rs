//! Cross-validated hyper-parameter search over a small fixed grid.

use crate::model::artifact::ModelArtifact;
use crate::model::booster::{predict_proba, BoosterParams};
use crate::model::dataset::{complement, Dataset, MODEL_FEATURES};
use crate::model::error::ModelError;
use crate::model::metrics::roc_auc;
use crate::types::feature_table::FeatureTable;
use chrono::Utc;
use log::{info, warn};
use std::path::Path;

pub const LEARNING_RATES: [f32; 3] = [0.01, 0.05, 0.1];
pub const MAX_DEPTHS: [u32; 3] = [4, 5, 6];
pub const MIN_LEAF_SIZES: [usize; 3] = [1, 5, 10];

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub folds: usize,
    pub min_rows: usize,
    /// How many parameter sets of the grid are tried.
    pub candidates: usize,
    pub iterations: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            min_rows: 30,
            candidates: 6,
            iterations: 200,
        }
    }
}

/// Mean held-out ROC AUC of one parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub params: BoosterParams,
    /// `None` when no fold had both classes.
    pub mean_roc_auc: Option<f64>,
    pub scored_folds: usize,
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub artifact: ModelArtifact,
    pub scores: Vec<CandidateScore>,
}

/// The first `count` parameter sets, picked evenly across the full grid in a fixed order.
pub fn candidate_grid(count: usize, iterations: usize) -> Vec<BoosterParams> {
    let mut grid = Vec::new();
    for learning_rate in LEARNING_RATES {
        for max_depth in MAX_DEPTHS {
            for min_leaf_size in MIN_LEAF_SIZES {
                grid.push(BoosterParams {
                    iterations,
                    learning_rate,
                    max_depth,
                    min_leaf_size,
                });
            }
        }
    }
    let count = count.clamp(1, grid.len());
    (0..count).map(|i| grid[i * grid.len() / count]).collect()
}

#[derive(Debug, Clone, Default)]
pub struct Search {
    config: SearchConfig,
}

impl Search {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Scores every candidate with stratified k-fold cross validation, then refits the best
    /// one on all rows.
    ///
    /// # Errors
    ///
    /// [`ModelError::InsufficientData`] when the table has fewer labelled rows than
    /// `min_rows`.
    pub fn run(&self, table: &FeatureTable) -> Result<SearchOutcome, ModelError> {
        let dataset = Dataset::from_feature_table(table)?;
        if dataset.len() < self.config.min_rows {
            return Err(ModelError::InsufficientData {
                rows: dataset.len(),
                required: self.config.min_rows,
            });
        }

        let folds = dataset.stratified_folds(self.config.folds);
        let candidates = candidate_grid(self.config.candidates, self.config.iterations);
        info!(
            "Searching {} candidates with {}-fold CV on {} rows",
            candidates.len(),
            folds.len(),
            dataset.len()
        );

        let mut scores = Vec::with_capacity(candidates.len());
        for params in candidates {
            let score = cross_validate(&dataset, &folds, params)?;
            match score.mean_roc_auc {
                Some(auc) => info!("{:?}: mean roc_auc {:.4}", params, auc),
                None => warn!("{:?}: no fold could be scored", params),
            }
            scores.push(score);
        }

        let best = scores
            .iter()
            .filter(|s| s.mean_roc_auc.is_some())
            .fold(None::<&CandidateScore>, |best, s| match best {
                Some(b) if b.mean_roc_auc >= s.mean_roc_auc => Some(b),
                _ => Some(s),
            })
            .or(scores.first())
            .copied()
            .ok_or_else(|| ModelError::Booster("no candidate parameters".to_string()))?;
        info!("Best parameters: {:?}", best.params);

        let model = best.params.fit(&dataset)?;
        let artifact = ModelArtifact {
            model,
            feature_columns: MODEL_FEATURES.iter().map(|c| c.to_string()).collect(),
            threshold: table.threshold,
            training_rows: dataset.len(),
            evaluation: None,
            cv_roc_auc: best.mean_roc_auc,
            params: best.params,
            trained_at: Utc::now(),
        };
        Ok(SearchOutcome { artifact, scores })
    }

    pub fn run_and_save(
        &self,
        table: &FeatureTable,
        path: &Path,
    ) -> Result<SearchOutcome, ModelError> {
        let outcome = self.run(table)?;
        outcome.artifact.save(path)?;
        Ok(outcome)
    }
}

fn cross_validate(
    dataset: &Dataset,
    folds: &[Vec<usize>],
    params: BoosterParams,
) -> Result<CandidateScore, ModelError> {
    let mut total = 0.0;
    let mut scored = 0;
    for held_out in folds.iter().filter(|f| !f.is_empty()) {
        let train = dataset.subset(&complement(dataset.len(), held_out));
        let test = dataset.subset(held_out);
        let model = params.fit(&train)?;
        if let Some(auc) = roc_auc(&test.labels, &predict_proba(&model, &test.features)) {
            total += auc;
            scored += 1;
        }
    }
    Ok(CandidateScore {
        params,
        mean_roc_auc: (scored > 0).then(|| total / scored as f64),
        scored_folds: scored,
    })
}
