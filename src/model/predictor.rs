//! Scores one location and date with a trained [`ModelArtifact`].

use crate::features::pipeline::build_features;
use crate::model::artifact::ModelArtifact;
use crate::model::dataset::feature_rows;
use crate::model::error::ModelError;
use crate::model::metrics::DEFAULT_CUTOFF;
use crate::patch::assembler::{PatchAssembler, PointSource, DEFAULT_GRID_SIZE, DEFAULT_RADIUS_DEG};
use crate::types::long_table::LongTable;
use crate::types::observation::LonLat;
use chrono::{Days, NaiveDate};
use log::info;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub location: LonLat,
    pub date: NaiveDate,
    /// Probability that precipitation reaches the model threshold.
    pub probability: f64,
    /// `1` when `probability >= 0.5`.
    pub predicted_class: u8,
}

#[derive(Debug)]
pub struct Predictor {
    artifact: ModelArtifact,
    lookback_days: u64,
    radius: f64,
    grid_width: usize,
    grid_height: usize,
}

impl Predictor {
    /// Wraps `artifact`. By default only the target date itself is fetched; use
    /// [`Predictor::with_lookback_days`] to fetch the history the lag features need.
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            artifact,
            lookback_days: 0,
            radius: DEFAULT_RADIUS_DEG,
            grid_width: DEFAULT_GRID_SIZE,
            grid_height: DEFAULT_GRID_SIZE,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Ok(Self::new(ModelArtifact::load(path)?))
    }

    pub fn with_lookback_days(mut self, days: u64) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_patch(mut self, radius: f64, grid_width: usize, grid_height: usize) -> Self {
        self.radius = radius;
        self.grid_width = grid_width;
        self.grid_height = grid_height;
        self
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Fetches the patch around `location` for the look-back window ending at `date`, then
    /// scores it with [`Predictor::predict_from_table`].
    pub fn predict_point<S: PointSource>(
        &self,
        assembler: &PatchAssembler<'_, S>,
        location: LonLat,
        date: NaiveDate,
    ) -> Result<Prediction, ModelError> {
        let start = date
            .checked_sub_days(Days::new(self.lookback_days))
            .unwrap_or(NaiveDate::MIN);
        info!(
            "Fetching patch around lon={} lat={} for {}..{}",
            location.lon(),
            location.lat(),
            start,
            date
        );
        let history = assembler
            .fetch_patch()
            .center(location)
            .radius(self.radius)
            .grid_width(self.grid_width)
            .grid_height(self.grid_height)
            .start(start)
            .end(date)
            .call()?;
        self.predict_from_table(&history, location, date)
    }

    /// Scores the row of `location` on `date` after running the feature pipeline on
    /// `history`.
    ///
    /// # Errors
    ///
    /// [`ModelError::NoFeaturesAvailable`] when that row is absent or incomplete, typically
    /// because `history` does not reach far enough back for the lag features.
    pub fn predict_from_table(
        &self,
        history: &LongTable,
        location: LonLat,
        date: NaiveDate,
    ) -> Result<Prediction, ModelError> {
        let features = build_features(history, self.artifact.threshold)?;
        let row = features
            .find_row(location, date)?
            .ok_or(ModelError::NoFeaturesAvailable {
                lon: location.lon(),
                lat: location.lat(),
                date,
            })?;

        let rows = feature_rows(&features, &self.artifact.feature_columns)?;
        let probability = self
            .artifact
            .predict_proba(&rows[row..=row])
            .first()
            .copied()
            .ok_or_else(|| ModelError::Booster("no prediction returned".to_string()))?;

        Ok(Prediction {
            location,
            date,
            probability,
            predicted_class: u8::from(probability >= DEFAULT_CUTOFF),
        })
    }
}
