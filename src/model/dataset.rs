//! Feature matrix extraction and deterministic stratified splitting.

use crate::types::feature_table::*;
use crate::types::long_table::T2M;
use polars::prelude::PolarsResult;

/// Columns fed to the booster, in order.
pub const MODEL_FEATURES: [&str; 10] = [
    SIN_DOY,
    COS_DOY,
    PRECIP_LAG_1,
    PRECIP_LAG_2,
    PRECIP_LAG_3,
    T2M,
    PRECIP_MEAN,
    PRECIP_STD,
    T2M_MEAN,
    T2M_STD,
];

/// One feature vector per row of `table`, taken from `columns` in order.
pub fn feature_rows<S: AsRef<str>>(
    table: &FeatureTable,
    columns: &[S],
) -> PolarsResult<Vec<Vec<Option<f64>>>> {
    let values = columns
        .iter()
        .map(|c| table.values(c.as_ref()))
        .collect::<PolarsResult<Vec<_>>>()?;
    Ok((0..table.height())
        .map(|row| values.iter().map(|column| column[row]).collect())
        .collect())
}

/// Labelled rows ready for fitting. Rows of the feature table without a label are left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<Option<f64>>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn from_feature_table(table: &FeatureTable) -> PolarsResult<Self> {
        let rows = feature_rows(table, &MODEL_FEATURES)?;
        let mut dataset = Self::default();
        for (features, label) in rows.into_iter().zip(table.labels()?) {
            if let Some(label) = label {
                dataset.features.push(features);
                dataset.labels.push(u8::from(label > 0));
            }
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|l| **l == 1).count()
    }

    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Row indices of each class, in row order.
    fn by_class(&self) -> [Vec<usize>; 2] {
        let mut classes = [Vec::new(), Vec::new()];
        for (i, label) in self.labels.iter().enumerate() {
            classes[usize::from(*label)].push(i);
        }
        classes
    }

    /// Splits into `(train, test)` indices so that each class contributes about
    /// `test_fraction` of its rows to the test side, spread evenly over its history.
    pub fn stratified_split(&self, test_fraction: f64) -> (Vec<usize>, Vec<usize>) {
        let fraction = test_fraction.clamp(0.0, 1.0);
        let mut train = Vec::new();
        let mut test = Vec::new();
        for class in self.by_class() {
            for (pos, row) in class.into_iter().enumerate() {
                let before = (pos as f64 * fraction).floor();
                let after = ((pos + 1) as f64 * fraction).floor();
                if after > before {
                    test.push(row);
                } else {
                    train.push(row);
                }
            }
        }
        train.sort_unstable();
        test.sort_unstable();
        (train, test)
    }

    /// Held-out indices of `k` folds; each class is dealt round-robin over the folds.
    pub fn stratified_folds(&self, k: usize) -> Vec<Vec<usize>> {
        let k = k.max(1);
        let mut folds = vec![Vec::new(); k];
        for class in self.by_class() {
            for (pos, row) in class.into_iter().enumerate() {
                folds[pos % k].push(row);
            }
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }
        folds
    }
}

/// Every index in `0..len` that is not in `held_out` (which must be sorted).
pub fn complement(len: usize, held_out: &[usize]) -> Vec<usize> {
    (0..len)
        .filter(|i| held_out.binary_search(i).is_err())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(labels: &[u8]) -> Dataset {
        Dataset {
            features: labels.iter().map(|l| vec![Some(f64::from(*l))]).collect(),
            labels: labels.to_vec(),
        }
    }

    #[test]
    fn test_split_is_stratified_and_disjoint() {
        let labels: Vec<u8> = (0..100).map(|i| u8::from(i % 4 == 0)).collect();
        let data = dataset(&labels);
        let (train, test) = data.stratified_split(0.3);

        assert_eq!(train.len() + test.len(), 100);
        assert!(train.iter().all(|i| test.binary_search(i).is_err()));
        let test_positives = test.iter().filter(|i| labels[**i] == 1).count();
        assert!((7..=8).contains(&test_positives), "{test_positives}");
        assert!((29..=31).contains(&test.len()), "{}", test.len());
    }

    #[test]
    fn test_split_is_deterministic() {
        let data = dataset(&[0, 1, 1, 0, 0, 1, 0, 0, 0, 1, 1, 0]);
        assert_eq!(data.stratified_split(0.3), data.stratified_split(0.3));
    }

    #[test]
    fn test_folds_cover_every_row_once() {
        let labels: Vec<u8> = (0..23).map(|i| u8::from(i % 3 == 0)).collect();
        let data = dataset(&labels);
        let folds = data.stratified_folds(5);
        assert_eq!(folds.len(), 5);

        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
        for fold in &folds {
            assert!(fold.iter().any(|i| labels[*i] == 1));
            assert_eq!(complement(23, fold).len(), 23 - fold.len());
        }
    }

    #[test]
    fn test_subset_keeps_rows_aligned() {
        let data = dataset(&[0, 1, 0, 1]);
        let sub = data.subset(&[1, 2]);
        assert_eq!(sub.labels, vec![1, 0]);
        assert_eq!(sub.features, vec![vec![Some(1.0)], vec![Some(0.0)]]);
        assert_eq!(sub.positives(), 1);
    }
}
