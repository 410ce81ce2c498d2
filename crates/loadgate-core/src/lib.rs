//! loadgate-core: storage and evaluation for recorded load-test runs.
//!
//! A [`recorder::ReportRecorder`] turns one load-generator report into a
//! stored run, re-evaluates the owning test's latency thresholds, and bulk
//! writes the per-request details through a bounded
//! [`ingest::BatchIngester`].

pub mod codec;
pub mod config;
pub mod ingest;
pub mod model;
pub mod recorder;
pub mod status;
pub mod storage;
pub mod threshold;

pub use config::Config;
pub use ingest::{BatchIngester, DetailStore, IngestOutcome};
pub use recorder::{RawReport, RecordError, RecordOutcome, ReportRecorder};
pub use status::StatusCode;
pub use storage::{SqliteStore, StoreError};
