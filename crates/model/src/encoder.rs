//! Per-column category encoders.
//!
//! Fitted once during training, read-only afterward. The vocabulary is
//! lexicographically sorted and always contains the reserved
//! `"unknown"` bucket, so encoding a value never seen at fit time is
//! well defined at inference and never fails.

use serde::{Deserialize, Serialize};

/// Sentinel label for missing and unseen category values.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Mapping from observed label strings to integer codes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Build an encoder over the observed values. Missing values must
    /// already be substituted with `UNKNOWN_LABEL` by the caller; the
    /// sentinel is inserted regardless so the unknown bucket exists
    /// even when every training value was present.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.push(UNKNOWN_LABEL.to_string());
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Integer code for a value; unseen values map to the unknown code.
    pub fn encode(&self, value: &str) -> usize {
        match self.classes.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(idx) => idx,
            Err(_) => self.unknown_code(),
        }
    }

    /// Code of the reserved unknown bucket.
    pub fn unknown_code(&self) -> usize {
        // The sentinel is inserted unconditionally in `fit`.
        self.classes
            .binary_search_by(|c| c.as_str().cmp(UNKNOWN_LABEL))
            .unwrap_or(0)
    }

    /// Sorted vocabulary, unknown bucket included.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}
