//! Z-score outlier filtering.
//!
//! One pass per numeric column, in sorted column order, with the mean
//! and standard deviation recomputed on the rows surviving the previous
//! columns. A row is dropped the first time any column puts it past the
//! threshold, so highly skewed columns can remove a large fraction of
//! the working set; callers must tolerate that loss. Rows with a
//! missing value in a column have no z-score there and are kept, as is
//! every row of a zero-variance column.

use tracing::debug;
use tripcost_model::TripTable;

/// Default |z| threshold.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Drop rows whose z-score magnitude meets or exceeds `z_threshold` in
/// any numeric non-identifier column.
pub fn remove_outliers(table: TripTable, z_threshold: f64) -> TripTable {
    let columns = table.numeric_columns();
    let mut current = table;

    for column in columns {
        let n = current.len();
        let values: Vec<Option<f64>> = (0..n).map(|row| current.numeric(row, &column)).collect();

        let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
        if present.len() < 2 {
            continue;
        }
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        let std = (present.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / present.len() as f64)
            .sqrt();
        if std == 0.0 {
            continue;
        }

        let keep: Vec<usize> = (0..n)
            .filter(|&row| match values[row] {
                Some(v) => ((v - mean) / std).abs() < z_threshold,
                None => true,
            })
            .collect();

        if keep.len() < n {
            debug!(
                column = column.as_str(),
                dropped = n - keep.len(),
                "outlier filter dropped rows"
            );
            current = current.select_rows(&keep);
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use tripcost_model::TripTable;

    fn row(distance: f64) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("distance".into(), json!(distance));
        m.insert("id".into(), json!(1));
        m
    }

    #[test]
    fn test_idempotent_on_clean_data() {
        let rows: Vec<_> = (0..20).map(|i| row(10.0 + i as f64)).collect();
        let table = TripTable::from_rows(rows).unwrap();
        let before = table.len();

        let once = remove_outliers(table, DEFAULT_Z_THRESHOLD);
        assert_eq!(once.len(), before);
        let twice = remove_outliers(once, DEFAULT_Z_THRESHOLD);
        assert_eq!(twice.len(), before);
    }

    #[test]
    fn test_drops_extreme_value() {
        let mut rows: Vec<_> = (0..30).map(|i| row(10.0 + (i % 3) as f64)).collect();
        rows.push(row(10_000.0));
        let table = TripTable::from_rows(rows).unwrap();

        let filtered = remove_outliers(table, DEFAULT_Z_THRESHOLD);
        assert_eq!(filtered.len(), 30);
        for i in 0..filtered.len() {
            assert!(filtered.numeric(i, "distance").unwrap() < 100.0);
        }
    }

    #[test]
    fn test_identifier_columns_exempt() {
        let mut rows: Vec<_> = (0..10).map(|_| row(10.0)).collect();
        // Wild id value must not cause a drop; distance is constant so
        // its column is skipped as zero-variance.
        rows[0].insert("id".into(), json!(999_999_999));
        let table = TripTable::from_rows(rows).unwrap();
        assert_eq!(remove_outliers(table, DEFAULT_Z_THRESHOLD).len(), 10);
    }

    #[test]
    fn test_missing_values_kept() {
        let mut rows: Vec<_> = (0..10).map(|i| row(10.0 + i as f64)).collect();
        let mut sparse = Map::new();
        sparse.insert("id".into(), json!(2));
        rows.push(sparse);
        let table = TripTable::from_rows(rows).unwrap();
        assert_eq!(remove_outliers(table, DEFAULT_Z_THRESHOLD).len(), 11);
    }
}
