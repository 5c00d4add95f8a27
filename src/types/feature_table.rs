//! Contains the `FeatureTable` structure produced by [`crate::build_features`].

use crate::types::long_table::{date_values, f64_values, LAT, LON};
use crate::types::observation::LonLat;
use chrono::NaiveDate;
use polars::prelude::{DataFrame, DataType, PolarsResult};

pub const SIN_DOY: &str = "sin_doy";
pub const COS_DOY: &str = "cos_doy";
pub const PRECIP_LAG_1: &str = "precip_lag_1";
pub const PRECIP_LAG_2: &str = "precip_lag_2";
pub const PRECIP_LAG_3: &str = "precip_lag_3";
pub const PRECIP_ROLL_3: &str = "precip_roll_3";
pub const PRECIP_ROLL_7: &str = "precip_roll_7";
pub const PRECIP_MEAN: &str = "precip_mean";
pub const PRECIP_STD: &str = "precip_std";
pub const PRECIP_MAX: &str = "precip_max";
pub const T2M_MEAN: &str = "t2m_mean";
pub const T2M_STD: &str = "t2m_std";
pub const LABEL: &str = "label";

/// Lag columns, matching `features::temporal::LAGS` in order.
pub const PRECIP_LAG_COLUMNS: [&str; 3] = [PRECIP_LAG_1, PRECIP_LAG_2, PRECIP_LAG_3];
/// Rolling-mean columns, matching `features::temporal::ROLLING_WINDOWS` in order.
pub const PRECIP_ROLL_COLUMNS: [&str; 2] = [PRECIP_ROLL_3, PRECIP_ROLL_7];

/// Columns that are guaranteed non-null on every row of a [`FeatureTable`].
pub const REQUIRED_FEATURES: [&str; 7] = [
    SIN_DOY,
    COS_DOY,
    PRECIP_LAG_1,
    PRECIP_LAG_2,
    PRECIP_LAG_3,
    crate::types::long_table::T2M,
    PRECIP_MEAN,
];

/// A wrapper around a Polars `DataFrame` of model-ready rows.
///
/// Every row is fully populated on [`REQUIRED_FEATURES`]; no other column carries that
/// guarantee (`precip_std` is null on dates observed at a single location, `label` is null
/// when the day's precipitation is missing). The table may have zero rows.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// The underlying Polars DataFrame.
    pub frame: DataFrame,
    /// Precipitation threshold (mm/day) the labels were derived with.
    pub threshold: f64,
}

impl FeatureTable {
    pub fn new(frame: DataFrame, threshold: f64) -> Self {
        Self { frame, threshold }
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Values of a numeric column, nulls preserved.
    pub fn values(&self, column: &str) -> PolarsResult<Vec<Option<f64>>> {
        f64_values(&self.frame, column)
    }

    pub fn labels(&self) -> PolarsResult<Vec<Option<i32>>> {
        let column = self.frame.column(LABEL)?.cast(&DataType::Int32)?;
        Ok(column.i32()?.into_iter().collect())
    }

    pub fn dates(&self) -> PolarsResult<Vec<Option<NaiveDate>>> {
        date_values(&self.frame, crate::types::long_table::DATE)
    }

    pub fn locations(&self) -> PolarsResult<Vec<Option<LonLat>>> {
        let lon = f64_values(&self.frame, LON)?;
        let lat = f64_values(&self.frame, LAT)?;
        Ok(lon
            .into_iter()
            .zip(lat)
            .map(|(lon, lat)| Some(LonLat(lon?, lat?)))
            .collect())
    }

    /// Index of the row for `location` on `date`, if the table has one.
    pub fn find_row(&self, location: LonLat, date: NaiveDate) -> PolarsResult<Option<usize>> {
        let locations = self.locations()?;
        let dates = self.dates()?;
        Ok(locations
            .iter()
            .zip(dates.iter())
            .position(|(l, d)| *l == Some(location) && *d == Some(date)))
    }
}
