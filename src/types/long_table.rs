//! Contains the `LongTable` structure: every observation of one patch fetch in a single frame.

use crate::types::observation::{LonLat, Observation};
use crate::utils::{date_to_epoch_days, epoch_days_to_date};
use chrono::NaiveDate;
use log::debug;
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, PolarsResult, Series};

pub const LON: &str = "lon";
pub const LAT: &str = "lat";
pub const DATE: &str = "date";
pub const T2M: &str = "t2m";
pub const PRECIP: &str = "precip";

/// Column set of a long table, in frame order.
pub const LONG_TABLE_COLUMNS: [&str; 5] = [LON, LAT, DATE, T2M, PRECIP];

/// A wrapper around a Polars `DataFrame` holding observations for many grid points.
///
/// The frame always carries the full typed column set `lon: f64, lat: f64, date: Date,
/// t2m: f64, precip: f64`, even when it has no rows, so downstream code can run typed
/// operations on it. Rows are kept in insertion order; no deduplication is done, callers
/// must make sure grid points are distinct.
#[derive(Debug, Clone)]
pub struct LongTable {
    /// The underlying Polars DataFrame.
    pub frame: DataFrame,
}

impl LongTable {
    /// Wraps an existing frame. The frame must contain the long-table columns; `date` may be
    /// any type that casts to `Date`.
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Builds a typed frame from observations, in the given order.
    pub fn from_observations(rows: &[Observation]) -> PolarsResult<Self> {
        let lon: Vec<f64> = rows.iter().map(|r| r.location.lon()).collect();
        let lat: Vec<f64> = rows.iter().map(|r| r.location.lat()).collect();
        let days: Vec<i32> = rows.iter().map(|r| date_to_epoch_days(r.date)).collect();
        let t2m: Vec<Option<f64>> = rows.iter().map(|r| r.t2m).collect();
        let precip: Vec<Option<f64>> = rows.iter().map(|r| r.precip).collect();

        let columns: Vec<Column> = vec![
            Series::new(LON.into(), lon).into(),
            Series::new(LAT.into(), lat).into(),
            Series::new(DATE.into(), days).cast(&DataType::Date)?.into(),
            Series::new(T2M.into(), t2m).into(),
            Series::new(PRECIP.into(), precip).into(),
        ];
        Ok(Self::new(DataFrame::new(columns)?))
    }

    /// An empty table that still has every long-table column.
    pub fn empty() -> PolarsResult<Self> {
        Self::from_observations(&[])
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Reads the rows back, normalizing `date` to a calendar date.
    ///
    /// Rows without a longitude, latitude or date cannot be keyed and are skipped.
    pub fn observations(&self) -> PolarsResult<Vec<Observation>> {
        let lon = f64_values(&self.frame, LON)?;
        let lat = f64_values(&self.frame, LAT)?;
        let dates = date_values(&self.frame, DATE)?;
        let t2m = f64_values(&self.frame, T2M)?;
        let precip = f64_values(&self.frame, PRECIP)?;

        let mut rows = Vec::with_capacity(self.frame.height());
        for i in 0..self.frame.height() {
            match (lon[i], lat[i], dates[i]) {
                (Some(lon), Some(lat), Some(date)) => {
                    rows.push(Observation::new(LonLat(lon, lat), date, t2m[i], precip[i]))
                }
                _ => debug!("Skipping long table row {} without location or date", i),
            }
        }
        Ok(rows)
    }
}

/// Reads a column as `f64` values, nulls preserved.
pub(crate) fn f64_values(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = frame.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Reads a column as calendar dates, nulls preserved.
pub(crate) fn date_values(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let column = frame
        .column(name)?
        .cast(&DataType::Date)?
        .cast(&DataType::Int32)?;
    Ok(column
        .i32()?
        .into_iter()
        .map(|days| days.and_then(epoch_days_to_date))
        .collect())
}
