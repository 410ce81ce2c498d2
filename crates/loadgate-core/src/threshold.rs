//! Threshold gating for tests.
//!
//! A test may configure a latency limit per [`ThresholdKind`]. Evaluating a
//! test against a run's aggregate latencies recomputes every configured
//! sub-status and the overall test status from scratch; nothing carries
//! over from a previous evaluation.

use crate::model::Test;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Latency statistic a threshold can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThresholdKind {
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "median")]
    Median,
    #[serde(rename = "95th")]
    P95,
    #[serde(rename = "99th")]
    P99,
}

impl ThresholdKind {
    /// Evaluation order.
    pub const ALL: [ThresholdKind; 4] = [
        ThresholdKind::Mean,
        ThresholdKind::Median,
        ThresholdKind::P95,
        ThresholdKind::P99,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdKind::Mean => "mean",
            ThresholdKind::Median => "median",
            ThresholdKind::P95 => "95th",
            ThresholdKind::P99 => "99th",
        }
    }
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured limit plus the derived sub-status of the last evaluation.
///
/// A zero `threshold` disables the limit ("no limit", not "must be zero").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSetting {
    #[serde(default)]
    pub status: StatusCode,
    #[serde(default, with = "crate::model::nanos")]
    pub threshold: Duration,
}

impl ThresholdSetting {
    pub fn new(threshold: Duration) -> Self {
        Self {
            status: StatusCode::Ok,
            threshold,
        }
    }

    /// Strict greater-than: a measurement equal to the limit passes.
    fn breached_by(&self, measured: Duration) -> bool {
        !self.threshold.is_zero() && !measured.is_zero() && measured > self.threshold
    }
}

/// Aggregate latencies of one run, as compared against thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub mean: Duration,
    pub median: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl LatencySummary {
    pub fn get(&self, kind: ThresholdKind) -> Duration {
        match kind {
            ThresholdKind::Mean => self.mean,
            ThresholdKind::Median => self.median,
            ThresholdKind::P95 => self.p95,
            ThresholdKind::P99 => self.p99,
        }
    }
}

/// Recompute `test.status` and every configured threshold sub-status.
///
/// Kinds without a configured setting are skipped. The overall status fails
/// when any configured kind fails, or when the test fails on errors and the
/// run had one.
pub fn evaluate(test: &mut Test, measured: &LatencySummary, had_error: bool) {
    let mut status = StatusCode::Ok;

    for kind in ThresholdKind::ALL {
        let Some(setting) = test.thresholds.get_mut(&kind) else {
            continue;
        };

        setting.status = StatusCode::Ok;
        if setting.breached_by(measured.get(kind)) {
            setting.status = StatusCode::Fail;
            status = StatusCode::Fail;
        }
    }

    if test.fail_on_error && had_error {
        status = StatusCode::Fail;
    }

    test.status = status;
}
