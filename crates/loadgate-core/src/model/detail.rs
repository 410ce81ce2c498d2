use super::{timestamp, ModelError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status recorded for a detail that reports none.
pub const DEFAULT_DETAIL_STATUS: &str = "OK";

/// A per-request sample as reported by the load generator, before it is
/// bound to a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailInput {
    #[serde(default, with = "timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Call latency.
    pub latency: f64,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub status: String,
}

impl DetailInput {
    pub fn new(latency: f64) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Attach the sample to `run_id` and normalize it for storage.
    pub fn bind(self, run_id: i64) -> Result<Detail, ModelError> {
        let mut detail = Detail {
            id: 0,
            run_id,
            timestamp: self.timestamp,
            latency: self.latency,
            error: self.error,
            status: self.status,
        };
        detail.prepare_write()?;
        Ok(detail)
    }
}

/// A stored per-request sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "runID")]
    pub run_id: i64,
    #[serde(default, with = "timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub latency: f64,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub status: String,
}

impl Detail {
    /// Enforce the run reference and trim `error`/`status`; an empty status
    /// becomes [`DEFAULT_DETAIL_STATUS`].
    pub fn prepare_write(&mut self) -> Result<(), ModelError> {
        if self.run_id <= 0 {
            return Err(ModelError::MissingParent {
                child: "detail",
                parent: "run",
            });
        }
        if !self.latency.is_finite() || self.latency < 0.0 {
            return Err(ModelError::InvalidLatency {
                latency: self.latency.to_string(),
            });
        }

        self.error = self.error.trim().to_string();
        let status = self.status.trim();
        self.status = if status.is_empty() {
            DEFAULT_DETAIL_STATUS.to_string()
        } else {
            status.to_string()
        };
        Ok(())
    }
}
