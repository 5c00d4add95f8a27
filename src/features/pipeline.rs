//! Turns a [`LongTable`] into a model-ready [`FeatureTable`].
//!
//! Steps, in order:
//! 1. normalize `date` and sort all rows by date (stable, ties keep input order),
//! 2. encode the day of year as `sin_doy`/`cos_doy`,
//! 3. per-location precipitation lags and trailing rolling means,
//! 4. per-date patch aggregates over every location, joined back by date,
//! 5. derive `label` from the threshold,
//! 6. drop rows missing any required feature.
//!
//! Patch aggregates are computed before the completeness filter, so rows that are dropped
//! later still count towards the statistics of their date.

use crate::features::cyclical::encode_day_of_year;
use crate::features::error::FeatureError;
use crate::features::filtering::FeatureFrameExt;
use crate::features::spatial::{patch_stats, PatchStats};
use crate::features::temporal::{lagged, location_groups, rolling_mean, LAGS, ROLLING_WINDOWS};
use crate::types::feature_table::*;
use crate::types::long_table::{LongTable, DATE, LAT, LON, PRECIP, T2M};
use crate::utils::date_to_epoch_days;
use log::{debug, info};
use polars::prelude::{Column, DataFrame, DataType, IntoLazy, NamedFrom, PolarsResult, Series};

/// Builds the feature table of `table`, labelling days with `precip >= threshold` as `1`.
///
/// Empty input, or input where every row is incomplete, gives a zero-row table with the full
/// feature column set.
///
/// # Errors
///
/// Returns [`FeatureError::DataFrameProcessing`] if the input frame lacks a long-table column
/// or a frame operation fails.
pub fn build_features(table: &LongTable, threshold: f64) -> Result<FeatureTable, FeatureError> {
    let mut rows = table.observations()?;
    rows.sort_by_key(|r| r.date);

    let precip: Vec<Option<f64>> = rows.iter().map(|r| r.precip).collect();
    let groups = location_groups(&rows);
    let stats = patch_stats(&rows);
    debug!(
        "Building features for {} rows, {} locations, {} dates",
        rows.len(),
        groups.len(),
        stats.len()
    );

    let (sin_doy, cos_doy): (Vec<f64>, Vec<f64>) =
        rows.iter().map(|r| encode_day_of_year(r.date)).unzip();
    let day_stats: Vec<PatchStats> = rows
        .iter()
        .map(|r| stats.get(&r.date).copied().unwrap_or_default())
        .collect();
    let stat = |f: fn(&PatchStats) -> Option<f64>| -> Vec<Option<f64>> {
        day_stats.iter().map(f).collect()
    };

    let mut columns: Vec<Column> = vec![
        Series::new(LON.into(), rows.iter().map(|r| r.location.lon()).collect::<Vec<_>>()).into(),
        Series::new(LAT.into(), rows.iter().map(|r| r.location.lat()).collect::<Vec<_>>()).into(),
        Series::new(
            DATE.into(),
            rows.iter()
                .map(|r| date_to_epoch_days(r.date))
                .collect::<Vec<_>>(),
        )
        .cast(&DataType::Date)?
        .into(),
        Series::new(T2M.into(), rows.iter().map(|r| r.t2m).collect::<Vec<_>>()).into(),
        Series::new(PRECIP.into(), precip.clone()).into(),
        Series::new(SIN_DOY.into(), sin_doy).into(),
        Series::new(COS_DOY.into(), cos_doy).into(),
    ];
    for (lag, name) in LAGS.into_iter().zip(PRECIP_LAG_COLUMNS) {
        columns.push(Series::new(name.into(), lagged(&precip, &groups, lag)).into());
    }
    for (window, name) in ROLLING_WINDOWS.into_iter().zip(PRECIP_ROLL_COLUMNS) {
        columns.push(Series::new(name.into(), rolling_mean(&precip, &groups, window)).into());
    }
    columns.extend([
        Series::new(PRECIP_MEAN.into(), stat(|s| s.precip_mean)),
        Series::new(PRECIP_STD.into(), stat(|s| s.precip_std)),
        Series::new(PRECIP_MAX.into(), stat(|s| s.precip_max)),
        Series::new(T2M_MEAN.into(), stat(|s| s.t2m_mean)),
        Series::new(T2M_STD.into(), stat(|s| s.t2m_std)),
    ]
    .map(Column::from));

    let frame = DataFrame::new(columns)?
        .lazy()
        .with_label(threshold)
        .filter_complete()
        .collect()?;

    info!(
        "Feature rows: {} of {} input rows complete",
        frame.height(),
        rows.len()
    );
    Ok(FeatureTable::new(frame, threshold))
}

/// Drops rows of `table` that miss any required feature. Applying it twice changes nothing.
pub fn filter_complete(table: &FeatureTable) -> Result<FeatureTable, FeatureError> {
    let frame = complete_frame(&table.frame)?;
    Ok(FeatureTable::new(frame, table.threshold))
}

fn complete_frame(frame: &DataFrame) -> PolarsResult<DataFrame> {
    frame.clone().lazy().filter_complete().collect()
}
