pub mod artifact;
pub mod booster;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod predictor;
pub mod search;
pub mod trainer;

#[cfg(test)]
pub(crate) mod fixtures;
