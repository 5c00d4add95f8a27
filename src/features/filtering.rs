use crate::types::feature_table::{LABEL, REQUIRED_FEATURES};
use crate::types::long_table::PRECIP;
use polars::prelude::{col, lit, DataType, Expr, LazyFrame};

pub trait FeatureFrameExt {
    /// Adds the binary `label` column: `1` when `precip >= threshold`, `0` below it and null
    /// when `precip` is null.
    fn with_label(self, threshold: f64) -> LazyFrame;

    /// Keeps only rows where every column of [`REQUIRED_FEATURES`] is non-null.
    fn filter_complete(self) -> LazyFrame;
}

impl FeatureFrameExt for LazyFrame {
    fn with_label(self, threshold: f64) -> LazyFrame {
        self.with_column(
            col(PRECIP)
                .gt_eq(lit(threshold))
                .cast(DataType::Int32)
                .alias(LABEL),
        )
    }

    fn filter_complete(self) -> LazyFrame {
        self.filter(complete_rows())
    }
}

fn complete_rows() -> Expr {
    REQUIRED_FEATURES
        .iter()
        .map(|name| col(*name).is_not_null())
        .reduce(|acc, e| acc.and(e))
        .unwrap_or_else(|| lit(true))
}
