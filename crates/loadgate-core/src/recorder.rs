//! Record a raw load-generator report: one run plus its details, with the
//! owning test's threshold status re-evaluated against the run.

use crate::codec::Distribution;
use crate::config::Config;
use crate::ingest::{BatchIngester, IngestOutcome};
use crate::model::{
    self, nanos, Bucket, DetailInput, LatencyDistribution, Options, Project, Run, Test,
};
use crate::storage::{SqliteStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("test not found: {0}")]
    TestNotFound(i64),
}

/// The load generator's JSON report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReport {
    #[serde(deserialize_with = "report_date")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
    #[serde(default)]
    pub count: u64,
    #[serde(default, with = "nanos")]
    pub total: Duration,
    #[serde(default, with = "nanos")]
    pub average: Duration,
    #[serde(default, with = "nanos")]
    pub fastest: Duration,
    #[serde(default, with = "nanos")]
    pub slowest: Duration,
    #[serde(default)]
    pub rps: f64,
    #[serde(
        rename = "errorDistribution",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error_dist: Option<Distribution>,
    #[serde(
        rename = "statusCodeDistribution",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_code_dist: Option<Distribution>,
    #[serde(default)]
    pub details: Vec<DetailInput>,
    #[serde(rename = "latencyDistribution", default)]
    pub latency_distribution: Vec<LatencyDistribution>,
    #[serde(default)]
    pub histogram: Vec<Bucket>,
}

fn report_date<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    model::parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

impl RawReport {
    /// Split the report into the run to store and the details to ingest.
    fn into_parts(self, test_id: i64) -> (Run, Vec<DetailInput>) {
        let run = Run {
            id: 0,
            test_id,
            date: self.date,
            count: self.count,
            total: self.total,
            average: self.average,
            fastest: self.fastest,
            slowest: self.slowest,
            rps: self.rps,
            status: Default::default(),
            options: self.options,
            error_dist: self.error_dist,
            status_code_dist: self.status_code_dist,
            latency_distribution: self.latency_distribution,
            histogram: self.histogram,
        };
        (run, self.details)
    }
}

/// Result of recording one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutcome {
    #[serde(rename = "projectID")]
    pub project_id: i64,
    pub test: Test,
    pub run: Run,
    pub details: IngestOutcome,
}

impl RecordOutcome {
    /// Every detail of the report was stored.
    pub fn is_complete(&self) -> bool {
        self.details.is_complete()
    }
}

#[derive(Clone)]
pub struct ReportRecorder {
    store: SqliteStore,
    ingester: BatchIngester<SqliteStore>,
}

impl ReportRecorder {
    pub fn new(store: SqliteStore, max_concurrent_writes: usize) -> Self {
        let ingester = BatchIngester::new(Arc::new(store.clone()), max_concurrent_writes);
        Self { store, ingester }
    }

    /// Open the configured database and size the ingester from `cfg.ingest`.
    pub fn from_config(cfg: &Config) -> Result<Self, RecordError> {
        let store = SqliteStore::open(&cfg.database.path)?;
        let ingester = BatchIngester::from_config(Arc::new(store.clone()), &cfg.ingest);
        Ok(Self { store, ingester })
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Record `report` as a new run of test `test_id`.
    ///
    /// The run and the re-evaluated test status are persisted before any
    /// detail is written; detail failures are reported in the outcome, not
    /// as an error.
    pub async fn record(
        &self,
        test_id: i64,
        report: RawReport,
    ) -> Result<RecordOutcome, RecordError> {
        let test = self
            .store
            .find_test(test_id)?
            .ok_or(RecordError::TestNotFound(test_id))?;
        self.record_into(test, report).await
    }

    /// Record `report` under a freshly created project and test, both with
    /// generated names.
    pub async fn record_new(&self, report: RawReport) -> Result<RecordOutcome, RecordError> {
        let mut project = Project::default();
        self.store.create_project(&mut project)?;

        let mut test = Test::new(project.id, "");
        self.store.create_test(&mut test)?;
        info!(
            project_id = project.id,
            test_id = test.id,
            test = %test.name,
            "created project and test for report"
        );

        self.record_into(test, report).await
    }

    async fn record_into(
        &self,
        mut test: Test,
        report: RawReport,
    ) -> Result<RecordOutcome, RecordError> {
        let (mut run, details) = report.into_parts(test.id);

        test.evaluate(&run.latency_summary(), run.has_errors());
        self.store.create_run(&mut run)?;
        self.store.update_test(&mut test)?;

        let outcome = self.ingester.ingest(run.id, details).await;

        if outcome.is_complete() {
            info!(
                test_id = test.id,
                run_id = run.id,
                status = %test.status,
                details = outcome.created,
                "recorded report"
            );
        } else {
            warn!(
                test_id = test.id,
                run_id = run.id,
                status = %test.status,
                created = outcome.created,
                failed = outcome.failed,
                "recorded report with detail failures"
            );
        }

        Ok(RecordOutcome {
            project_id: test.project_id,
            test,
            run,
            details: outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_accepts_each_date_layout() {
        for date in [
            "2018-08-08T13:00:00Z",
            "2018-08-08T13:00:00.666Z",
            "2018-08-08T15:00:00+0200",
        ] {
            let json = format!(r#"{{"date": "{}"}}"#, date);
            let report: RawReport = serde_json::from_str(&json).unwrap();
            assert_eq!(report.date.to_rfc3339().get(..19), Some("2018-08-08T13:00:00"));
        }
    }

    #[test]
    fn report_rejects_bad_or_missing_date() {
        assert!(serde_json::from_str::<RawReport>(r#"{"date": "yesterday"}"#).is_err());
        assert!(serde_json::from_str::<RawReport>(r#"{"count": 3}"#).is_err());
    }

    #[test]
    fn report_splits_into_run_and_details() {
        let json = r#"{
            "date": "2018-08-08T13:00:00Z",
            "count": 200,
            "total": 2000000000,
            "average": 5000000,
            "fastest": 1000000,
            "slowest": 9000000,
            "rps": 100.5,
            "errorDistribution": {"unavailable": 2},
            "statusCodeDistribution": {"OK": 198, "Unavailable": 2},
            "latencyDistribution": [{"percentage": 50, "latency": 4000000}],
            "histogram": [{"mark": 0.01, "count": 200, "frequency": 1.0}],
            "details": [
                {"timestamp": "2018-08-08T13:00:00Z", "latency": 4000000, "status": "OK"},
                {"latency": 6000000, "error": "unavailable", "status": "Unavailable"}
            ]
        }"#;
        let report: RawReport = serde_json::from_str(json).unwrap();
        let (run, details) = report.into_parts(7);

        assert_eq!(run.test_id, 7);
        assert_eq!(run.count, 200);
        assert_eq!(run.average, Duration::from_millis(5));
        assert!(run.has_errors());
        assert_eq!(run.latency_summary().median, Duration::from_millis(4));
        assert_eq!(run.histogram.len(), 1);
        assert_eq!(details.len(), 2);
        assert!(details[1].timestamp.is_none());
    }

    #[test]
    fn from_config_sizes_ingester() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.database.path = dir.path().join("cfg.db");
        cfg.ingest.max_concurrent_writes = 3;

        let recorder = ReportRecorder::from_config(&cfg).unwrap();
        assert_eq!(recorder.ingester.max_concurrent_writes(), 3);
        assert_eq!(recorder.store().count_projects().unwrap(), 0);
    }

    #[test]
    fn outcome_shape() {
        let outcome = RecordOutcome {
            project_id: 1,
            test: Test::new(1, "t"),
            run: Run::new(1),
            details: IngestOutcome { created: 2, failed: 0 },
        };
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["projectID"], 1);
        assert_eq!(v["details"], serde_json::json!({"success": 2, "fail": 0}));
        assert!(outcome.is_complete());
    }
}
