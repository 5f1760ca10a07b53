//! Row-major table of raw trip records.
//!
//! The remote store returns flat JSON objects; `TripTable` keeps them
//! as-is and provides typed column access. A column is considered
//! present when any row carries the key, matching the loose tabular
//! semantics of the view the records come from.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::errors::{ModelError, Result};

/// Columns that identify rows and must never be treated as features.
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["id", "user_id"];

/// One run's working set of labeled trip records.
#[derive(Clone, Debug)]
pub struct TripTable {
    rows: Vec<Map<String, Value>>,
}

impl TripTable {
    /// Build a table from fetched rows. An empty result set is a fatal
    /// data error: there is nothing to train on.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTable(
                "remote store returned zero rows".into(),
            ));
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    /// A column exists if at least one row carries the key.
    pub fn has_column(&self, name: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(name))
    }

    /// Numeric value of a cell; JSON booleans coerce to 0.0 / 1.0.
    /// Missing keys, nulls, and non-numeric values yield `None`.
    pub fn numeric(&self, row: usize, column: &str) -> Option<f64> {
        match self.rows.get(row)?.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Categorical value of a cell rendered as a string. Missing keys
    /// and nulls yield `None`; numbers and booleans are stringified so
    /// that mixed-typed category columns still encode consistently.
    pub fn categorical(&self, row: usize, column: &str) -> Option<String> {
        match self.rows.get(row)?.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Names of all columns holding at least one JSON number, sorted
    /// for deterministic iteration, identifiers excluded.
    pub fn numeric_columns(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for row in &self.rows {
            for (key, value) in row {
                if value.is_number() && !IDENTIFIER_COLUMNS.contains(&key.as_str()) {
                    names.insert(key.clone());
                }
            }
        }
        names.into_iter().collect()
    }

    /// Extract the label vector. Every row must carry a numeric value;
    /// a missing or null label is unrecoverable for training.
    pub fn label_vector(&self, column: &str) -> Result<Vec<f64>> {
        if !self.has_column(column) {
            return Err(ModelError::MissingColumn(column.to_string()));
        }
        let mut labels = Vec::with_capacity(self.rows.len());
        for row in 0..self.rows.len() {
            match self.numeric(row, column) {
                Some(v) => labels.push(v),
                None => {
                    return Err(ModelError::InvalidValue {
                        column: column.to_string(),
                        row,
                    })
                }
            }
        }
        Ok(labels)
    }

    /// Retain only the rows at the given indices, in order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_rows_rejected() {
        let err = TripTable::from_rows(Vec::new()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyTable(_)));
    }

    #[test]
    fn test_column_presence_and_access() {
        let table = TripTable::from_rows(vec![
            row(&[("distance", json!(12.5)), ("traffic_level", json!("high"))]),
            row(&[("distance", json!(3.0))]),
        ])
        .unwrap();

        assert!(table.has_column("traffic_level"));
        assert!(!table.has_column("weather_condition"));
        assert_eq!(table.numeric(0, "distance"), Some(12.5));
        assert_eq!(table.numeric(1, "traffic_level"), None);
        assert_eq!(table.categorical(0, "traffic_level").as_deref(), Some("high"));
        assert_eq!(table.categorical(1, "traffic_level"), None);
    }

    #[test]
    fn test_booleans_coerce_to_numeric() {
        let table = TripTable::from_rows(vec![row(&[("is_weekend", json!(true))])]).unwrap();
        assert_eq!(table.numeric(0, "is_weekend"), Some(1.0));
    }

    #[test]
    fn test_numeric_columns_skip_identifiers() {
        let table = TripTable::from_rows(vec![row(&[
            ("id", json!(7)),
            ("user_id", json!(3)),
            ("distance", json!(1.0)),
            ("is_weekend", json!(false)),
        ])])
        .unwrap();
        assert_eq!(table.numeric_columns(), vec!["distance".to_string()]);
    }

    #[test]
    fn test_label_vector_requires_numeric_values() {
        let table = TripTable::from_rows(vec![
            row(&[("actual_cost", json!(150_000.0))]),
            row(&[("actual_cost", json!(null))]),
        ])
        .unwrap();
        let err = table.label_vector("actual_cost").unwrap_err();
        assert!(matches!(err, ModelError::InvalidValue { row: 1, .. }));
    }
}
