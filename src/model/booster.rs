//! Thin layer over the `gbdt` crate: parameter set, fitting and probability output.

use crate::model::dataset::Dataset;
use crate::model::error::ModelError;
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, ValueType, VALUE_TYPE_UNKNOWN};
use gbdt::gradient_boost::GBDT;
use log::debug;
use serde::{Deserialize, Serialize};

/// Binary log-likelihood loss; expects labels of `+1`/`-1` and predicts probabilities.
pub const LOSS: &str = "LogLikelyhood";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    pub iterations: usize,
    pub learning_rate: f32,
    pub max_depth: u32,
    pub min_leaf_size: usize,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            iterations: 200,
            learning_rate: 0.1,
            max_depth: 5,
            min_leaf_size: 20,
        }
    }
}

impl BoosterParams {
    fn config(&self, feature_size: usize) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(feature_size);
        cfg.set_max_depth(self.max_depth);
        cfg.set_iterations(self.iterations);
        cfg.set_shrinkage(self.learning_rate);
        cfg.set_min_leaf_size(self.min_leaf_size);
        cfg.set_loss(LOSS);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_data_sample_ratio(1.0);
        cfg.set_training_optimization_level(2);
        cfg.set_debug(false);
        cfg
    }

    /// Fits a booster on every row of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Booster`] when `data` is empty or its rows differ in width.
    pub fn fit(&self, data: &Dataset) -> Result<GBDT, ModelError> {
        let width = data.features.first().map(Vec::len).unwrap_or(0);
        if data.is_empty() || width == 0 {
            return Err(ModelError::Booster("no training rows".to_string()));
        }
        if data.features.iter().any(|row| row.len() != width) {
            return Err(ModelError::Booster(
                "training rows have different widths".to_string(),
            ));
        }

        let mut training: DataVec = data
            .features
            .iter()
            .zip(&data.labels)
            .map(|(row, label)| {
                let target: ValueType = if *label == 1 { 1.0 } else { -1.0 };
                Data::new_training_data(encode_row(row), 1.0, target, None)
            })
            .collect();

        debug!(
            "Fitting booster on {} rows x {} features with {:?}",
            data.len(),
            width,
            self
        );
        let mut model = GBDT::new(&self.config(width));
        model.fit(&mut training);
        Ok(model)
    }
}

/// Positive-class probability of each row.
pub fn predict_proba(model: &GBDT, rows: &[Vec<Option<f64>>]) -> Vec<f64> {
    if rows.is_empty() {
        return Vec::new();
    }
    let test: DataVec = rows
        .iter()
        .map(|row| Data::new_test_data(encode_row(row), None))
        .collect();
    model
        .predict(&test)
        .into_iter()
        .map(|p| f64::from(p).clamp(0.0, 1.0))
        .collect()
}

fn encode_row(row: &[Option<f64>]) -> Vec<ValueType> {
    row.iter()
        .map(|v| match v {
            Some(v) if v.is_finite() => *v as ValueType,
            _ => VALUE_TYPE_UNKNOWN,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Label is 1 when the first feature is above 5; the second feature is noise.
    fn separable(n: usize) -> Dataset {
        let mut data = Dataset::default();
        for i in 0..n {
            let x = (i % 10) as f64;
            let noise = ((i * 7) % 13) as f64;
            data.features.push(vec![Some(x), Some(noise)]);
            data.labels.push(u8::from(x > 5.0));
        }
        data
    }

    fn small_params() -> BoosterParams {
        BoosterParams {
            iterations: 30,
            learning_rate: 0.1,
            max_depth: 3,
            min_leaf_size: 2,
        }
    }

    #[test]
    fn test_fit_separates_classes() {
        let model = small_params().fit(&separable(100)).unwrap();
        let probs = predict_proba(&model, &[vec![Some(9.0), Some(3.0)], vec![Some(1.0), Some(3.0)]]);
        assert_eq!(probs.len(), 2);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(probs[0] > 0.5, "{probs:?}");
        assert!(probs[1] < 0.5, "{probs:?}");
    }

    #[test]
    fn test_missing_values_are_accepted() {
        let model = small_params().fit(&separable(60)).unwrap();
        let probs = predict_proba(&model, &[vec![None, Some(1.0)]]);
        assert_eq!(probs.len(), 1);
        assert!((0.0..=1.0).contains(&probs[0]));
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        assert!(matches!(
            BoosterParams::default().fit(&Dataset::default()),
            Err(ModelError::Booster(_))
        ));
    }
}
