//! Per-location lag and trailing rolling-mean features.
//!
//! All functions work on a slice of rows already sorted by date and group rows by their
//! `(lon, lat)` key. Offsets count rows inside a group, not calendar days: a gap in a
//! location's history does not produce a missing lag.

use crate::types::observation::{LocationKey, Observation};
use std::collections::BTreeMap;

pub const LAGS: [usize; 3] = [1, 2, 3];
pub const ROLLING_WINDOWS: [usize; 2] = [3, 7];

/// Row indices of each location, in slice order.
pub fn location_groups(rows: &[Observation]) -> BTreeMap<LocationKey, Vec<usize>> {
    let mut groups: BTreeMap<LocationKey, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        groups.entry(row.location.key()).or_default().push(i);
    }
    groups
}

/// `values` shifted forward by `lag` rows within each group.
pub fn lagged(
    values: &[Option<f64>],
    groups: &BTreeMap<LocationKey, Vec<usize>>,
    lag: usize,
) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for indices in groups.values() {
        for (pos, &row) in indices.iter().enumerate().skip(lag) {
            out[row] = values[indices[pos - lag]];
        }
    }
    out
}

/// Trailing mean over the last `window` rows of each group, ignoring missing values.
///
/// A window with at least one value yields its mean, so the first row of a group is its own
/// value. A window with no values yields `None`.
pub fn rolling_mean(
    values: &[Option<f64>],
    groups: &BTreeMap<LocationKey, Vec<usize>>,
    window: usize,
) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for indices in groups.values() {
        for (pos, &row) in indices.iter().enumerate() {
            let from = (pos + 1).saturating_sub(window);
            let (sum, count) = indices[from..=pos]
                .iter()
                .filter_map(|&i| values[i])
                .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            if count > 0 {
                out[row] = Some(sum / count as f64);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::LonLat;
    use chrono::NaiveDate;

    fn rows(values: &[(LonLat, u32, Option<f64>)]) -> Vec<Observation> {
        values
            .iter()
            .map(|(loc, d, p)| {
                Observation::new(*loc, NaiveDate::from_ymd_opt(2020, 3, *d).unwrap(), Some(5.0), *p)
            })
            .collect()
    }

    #[test]
    fn test_lag_stays_inside_location() {
        let a = LonLat(1.0, 1.0);
        let b = LonLat(2.0, 1.0);
        // Interleaved, as after a date sort.
        let rows = rows(&[
            (a, 1, Some(1.0)),
            (b, 1, Some(10.0)),
            (a, 2, Some(2.0)),
            (b, 2, None),
            (a, 3, Some(3.0)),
            (b, 3, Some(30.0)),
        ]);
        let precip: Vec<Option<f64>> = rows.iter().map(|r| r.precip).collect();
        let groups = location_groups(&rows);

        assert_eq!(
            lagged(&precip, &groups, 1),
            vec![None, None, Some(1.0), Some(10.0), Some(2.0), None]
        );
        assert_eq!(
            lagged(&precip, &groups, 2),
            vec![None, None, None, None, Some(1.0), Some(10.0)]
        );
        assert!(lagged(&precip, &groups, 3).iter().all(Option::is_none));
    }

    #[test]
    fn test_lag_counts_rows_not_days() {
        let a = LonLat(0.0, 0.0);
        let rows = rows(&[(a, 1, Some(1.0)), (a, 5, Some(5.0))]);
        let precip: Vec<Option<f64>> = rows.iter().map(|r| r.precip).collect();
        let groups = location_groups(&rows);
        assert_eq!(lagged(&precip, &groups, 1), vec![None, Some(1.0)]);
    }

    #[test]
    fn test_rolling_mean_min_one_value() {
        let a = LonLat(0.0, 0.0);
        let rows = rows(&[
            (a, 1, Some(3.0)),
            (a, 2, None),
            (a, 3, Some(6.0)),
            (a, 4, Some(9.0)),
            (a, 5, None),
            (a, 6, None),
            (a, 7, None),
        ]);
        let precip: Vec<Option<f64>> = rows.iter().map(|r| r.precip).collect();
        let groups = location_groups(&rows);

        let roll_3 = rolling_mean(&precip, &groups, 3);
        assert_eq!(
            roll_3,
            vec![
                Some(3.0),
                Some(3.0),
                Some(4.5),
                Some(7.5),
                Some(7.5),
                Some(9.0),
                None
            ]
        );

        let roll_7 = rolling_mean(&precip, &groups, 7);
        assert_eq!(roll_7[6], Some(6.0));
    }

    #[test]
    fn test_rolling_mean_first_row_of_group_is_own_value() {
        let a = LonLat(0.0, 0.0);
        let b = LonLat(0.1, 0.0);
        let rows = rows(&[(a, 1, Some(2.0)), (b, 1, Some(8.0)), (a, 2, Some(4.0))]);
        let precip: Vec<Option<f64>> = rows.iter().map(|r| r.precip).collect();
        let groups = location_groups(&rows);
        for window in ROLLING_WINDOWS {
            let rolled = rolling_mean(&precip, &groups, window);
            assert_eq!(rolled[0], Some(2.0));
            assert_eq!(rolled[1], Some(8.0));
            assert_eq!(rolled[2], Some(3.0));
        }
    }
}
