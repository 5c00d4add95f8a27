//! Per-date aggregates over every location of a patch.

use crate::types::observation::Observation;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Patch-wide statistics of one date. Missing values are ignored; a standard deviation
/// needs at least two values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PatchStats {
    pub precip_mean: Option<f64>,
    pub precip_std: Option<f64>,
    pub precip_max: Option<f64>,
    pub t2m_mean: Option<f64>,
    pub t2m_std: Option<f64>,
}

/// Mean, sample standard deviation and maximum of a set of values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Summary {
    mean: Option<f64>,
    std: Option<f64>,
    max: Option<f64>,
}

impl Summary {
    fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.len() > 1).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        });
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            mean: Some(mean),
            std,
            max: Some(max),
        }
    }
}

/// Aggregates all rows sharing a date, whatever their location.
pub fn patch_stats(rows: &[Observation]) -> BTreeMap<NaiveDate, PatchStats> {
    let mut by_date: BTreeMap<NaiveDate, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for row in rows {
        let (precip, t2m) = by_date.entry(row.date).or_default();
        precip.extend(row.precip);
        t2m.extend(row.t2m);
    }

    by_date
        .into_iter()
        .map(|(date, (precip, t2m))| {
            let precip = Summary::of(&precip);
            let t2m = Summary::of(&t2m);
            let stats = PatchStats {
                precip_mean: precip.mean,
                precip_std: precip.std,
                precip_max: precip.max,
                t2m_mean: t2m.mean,
                t2m_std: t2m.std,
            };
            (date, stats)
        })
        .collect()
}
