//! End-to-end recording of load-generator reports.

use loadgate_core::model::{Project, Test};
use loadgate_core::storage::{DetailSort, Page};
use loadgate_core::threshold::ThresholdKind;
use loadgate_core::{Config, RawReport, RecordError, ReportRecorder, SqliteStore, StatusCode};
use std::time::Duration;

const REPORT: &str = r#"{
    "date": "2018-08-08T13:00:00.666Z",
    "options": {"call": "shop.Orders.Place", "host": "localhost:50051", "n": 4, "c": 2},
    "count": 4,
    "total": 40000000,
    "average": 10000000,
    "fastest": 5000000,
    "slowest": 20000000,
    "rps": 100,
    "statusCodeDistribution": {"OK": 4},
    "latencyDistribution": [
        {"percentage": 50, "latency": 9000000},
        {"percentage": 95, "latency": 19000000},
        {"percentage": 99, "latency": 20000000}
    ],
    "histogram": [
        {"mark": 0.005, "count": 1, "frequency": 0.25},
        {"mark": 0.02, "count": 3, "frequency": 0.75}
    ],
    "details": [
        {"timestamp": "2018-08-08T13:00:00Z", "latency": 5000000, "status": "OK"},
        {"timestamp": "2018-08-08T13:00:00.1Z", "latency": 9000000},
        {"timestamp": "2018-08-08T13:00:00.2Z", "latency": 16000000, "status": " OK "},
        {"latency": 20000000, "status": "OK"}
    ]
}"#;

fn seeded(store: &SqliteStore, mean_limit: Duration) -> anyhow::Result<Test> {
    let mut project = Project::new("shop");
    store.create_project(&mut project)?;
    let mut test = Test::new(project.id, "place order")
        .with_threshold(ThresholdKind::Mean, mean_limit)
        .with_threshold(ThresholdKind::P99, Duration::from_millis(50));
    store.create_test(&mut test)?;
    Ok(test)
}

#[tokio::test]
async fn test_record_passing_report() -> anyhow::Result<()> {
    let store = SqliteStore::memory()?;
    let test = seeded(&store, Duration::from_millis(15))?;
    let recorder = ReportRecorder::new(store.clone(), 3);

    let report: RawReport = serde_json::from_str(REPORT)?;
    let outcome = recorder.record(test.id, report).await?;

    assert!(outcome.is_complete());
    assert_eq!(outcome.details.created, 4);
    assert_eq!(outcome.project_id, test.project_id);
    assert_eq!(outcome.run.status, StatusCode::Ok);
    assert_eq!(outcome.test.status, StatusCode::Ok);

    let run = store.find_run(outcome.run.id)?.unwrap();
    assert_eq!(run.count, 4);
    assert_eq!(run.histogram.len(), 2);
    assert_eq!(run.latency_distribution.len(), 3);
    assert_eq!(store.count_details(run.id)?, 4);

    let details = store.list_details(run.id, Page::default(), DetailSort::default())?;
    assert!(details.iter().all(|d| d.status == "OK"));
    Ok(())
}

#[tokio::test]
async fn test_record_breaching_report_persists_failed_status() -> anyhow::Result<()> {
    let store = SqliteStore::memory()?;
    let test = seeded(&store, Duration::from_millis(8))?;
    let recorder = ReportRecorder::new(store.clone(), 2);

    let report: RawReport = serde_json::from_str(REPORT)?;
    let outcome = recorder.record(test.id, report).await?;

    assert_eq!(outcome.test.status, StatusCode::Fail);
    assert_eq!(
        outcome.test.thresholds[&ThresholdKind::Mean].status,
        StatusCode::Fail
    );
    assert_eq!(
        outcome.test.thresholds[&ThresholdKind::P99].status,
        StatusCode::Ok
    );

    let stored = store.find_test(test.id)?.unwrap();
    assert_eq!(stored.status, StatusCode::Fail);
    assert_eq!(stored.thresholds, outcome.test.thresholds);
    Ok(())
}

#[tokio::test]
async fn test_record_report_with_errors_fails_fail_on_error_test() -> anyhow::Result<()> {
    let store = SqliteStore::memory()?;
    let mut project = Project::new("shop");
    store.create_project(&mut project)?;
    let mut test = Test::new(project.id, "strict").with_fail_on_error(true);
    store.create_test(&mut test)?;
    let recorder = ReportRecorder::new(store.clone(), 2);

    let mut report: RawReport = serde_json::from_str(REPORT)?;
    report.error_dist = Some([("unavailable".to_string(), 1)].into_iter().collect());
    let outcome = recorder.record(test.id, report).await?;

    assert_eq!(outcome.run.status, StatusCode::Fail);
    assert_eq!(outcome.test.status, StatusCode::Fail);
    Ok(())
}

#[tokio::test]
async fn test_record_new_creates_project_and_test() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = Config::default();
    cfg.database.path = dir.path().join("results.db");
    cfg.ingest.max_concurrent_writes = 4;
    cfg.validate()?;
    let recorder = ReportRecorder::from_config(&cfg)?;

    let report: RawReport = serde_json::from_str(REPORT)?;
    let outcome = recorder.record_new(report).await?;

    let store = recorder.store();
    assert_eq!(store.count_projects()?, 1);
    assert_eq!(outcome.test.name.len(), 16);
    assert_eq!(outcome.test.name, outcome.test.name.to_lowercase());
    assert_eq!(store.count_runs(outcome.test.id)?, 1);
    assert_eq!(store.count_details(outcome.run.id)?, 4);
    Ok(())
}

#[tokio::test]
async fn test_record_for_missing_test() -> anyhow::Result<()> {
    let recorder = ReportRecorder::new(SqliteStore::memory()?, 2);
    let report: RawReport = serde_json::from_str(REPORT)?;
    let err = recorder.record(404, report).await.unwrap_err();
    assert!(matches!(err, RecordError::TestNotFound(404)));
    assert_eq!(recorder.store().count_projects()?, 0);
    Ok(())
}
