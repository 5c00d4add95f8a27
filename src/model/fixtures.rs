//! Synthetic patch history shared by the model tests.

use crate::features::pipeline::build_features;
use crate::types::feature_table::FeatureTable;
use crate::types::long_table::LongTable;
use crate::types::observation::{LonLat, Observation};
use chrono::{Days, NaiveDate};

pub const THRESHOLD: f64 = 1.0;
pub const CENTER: LonLat = LonLat(-80.25, 43.55);
pub const NEIGHBOUR: LonLat = LonLat(-80.35, 43.55);

pub fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// About 30% wet days, shared by both locations so the patch mean tracks the label.
pub fn history(days: u64) -> LongTable {
    let mut rows = Vec::new();
    for (scale, location) in [(1.0, CENTER), (1.2, NEIGHBOUR)] {
        for i in 0..days {
            let date = first_day().checked_add_days(Days::new(i)).unwrap();
            let wet = (i * 7 + 3) % 10 < 3;
            let precip = if wet { 6.0 * scale } else { 0.1 * scale };
            let t2m = 10.0 + (i % 5) as f64;
            rows.push(Observation::new(location, date, Some(t2m), Some(precip)));
        }
    }
    LongTable::from_observations(&rows).unwrap()
}

pub fn features(days: u64) -> FeatureTable {
    build_features(&history(days), THRESHOLD).unwrap()
}
