//! Supabase REST client for the two store interactions.
//!
//! Both calls are synchronous, blocking, unretried, and uncancellable:
//! one read of the training view at the start of the run, one metrics
//! insert at the end.

use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, warn};
use tripcost_model::TripTable;

use crate::errors::{Result, TrainerError};

/// Environment variable holding the project endpoint.
pub const ENV_URL: &str = "SUPABASE_URL";
/// Environment variable holding the service-role key (full access).
pub const ENV_SERVICE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// View the labeled trip records are read from.
const TRAINING_VIEW: &str = "ml_training_data";
/// Table one metrics row is appended to per run.
const METRICS_TABLE: &str = "model_metrics";

/// Soft guard on the fetched row count: fewer rows than the recommended
/// minimum warns but never aborts the run. Returns whether the count was
/// below the minimum.
pub fn below_recommended_minimum(samples: usize, min_samples: usize) -> bool {
    if samples < min_samples {
        warn!(
            samples,
            min_samples, "fewer samples than the recommended minimum; continuing anyway"
        );
        return true;
    }
    false
}

/// Blocking REST client scoped to one Supabase project.
pub struct SupabaseClient {
    base_url: String,
    service_key: String,
    http: reqwest::blocking::Client,
}

impl SupabaseClient {
    /// Read endpoint and credentials from the environment. Missing
    /// configuration aborts before any work begins.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(ENV_URL)
            .map_err(|_| TrainerError::Config(format!("{ENV_URL} is not set")))?;
        let service_key = std::env::var(ENV_SERVICE_KEY)
            .map_err(|_| TrainerError::Config(format!("{ENV_SERVICE_KEY} is not set")))?;
        Self::new(base_url, service_key)
    }

    pub fn new(base_url: String, service_key: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            http,
        })
    }

    /// Fetch all labeled rows from the training view. Zero rows is
    /// fatal; a count below `min_samples` only warns, the run goes on.
    pub fn fetch_training_rows(&self, min_samples: usize) -> Result<TripTable> {
        let url = format!("{}/rest/v1/{}?select=*", self.base_url, TRAINING_VIEW);
        info!(view = TRAINING_VIEW, "fetching training data");

        let response = self
            .http
            .get(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(TrainerError::DataUnavailable(format!(
                "fetch failed with status {status}: {body}"
            )));
        }

        let rows: Vec<Map<String, Value>> = response.json()?;
        let table = TripTable::from_rows(rows)
            .map_err(|e| TrainerError::DataUnavailable(e.to_string()))?;

        info!(samples = table.len(), "fetched training data");
        below_recommended_minimum(table.len(), min_samples);
        Ok(table)
    }

    /// Append one metrics row. A rejected insert is fatal; there is no
    /// retry and no cleanup of the already-written export artifacts.
    pub fn insert_model_metrics<T: Serialize>(&self, record: &T) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.base_url, METRICS_TABLE);
        info!(table = METRICS_TABLE, "saving metrics to database");

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrainerError::RemoteWrite {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        info!("metrics row inserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            SupabaseClient::new("https://example.supabase.co/".into(), "key".into()).unwrap();
        assert_eq!(client.base_url, "https://example.supabase.co");
    }

    #[test]
    fn test_minimum_sample_guard_is_soft() {
        assert!(below_recommended_minimum(50, 100));
        assert!(below_recommended_minimum(99, 100));
        assert!(!below_recommended_minimum(100, 100));
        assert!(!below_recommended_minimum(150, 100));
    }

    #[test]
    fn test_from_env_requires_both_values() {
        std::env::remove_var(ENV_URL);
        std::env::remove_var(ENV_SERVICE_KEY);
        assert!(matches!(
            SupabaseClient::from_env(),
            Err(TrainerError::Config(_))
        ));
    }
}
