//! Bounded-concurrency bulk writer for run details.
//!
//! Every detail is persisted on its own through [`DetailStore::create_detail`];
//! at most `max_concurrent_writes` of those calls are in flight at once. A
//! failed record is counted and logged, never fatal to the batch, and
//! records already written stay written. [`BatchIngester::ingest`] returns
//! only once every dispatched write has finished.
//!
//! No timeout is applied to individual writes. Callers that need a deadline
//! must wrap the whole ingest call.

use crate::config::IngestConfig;
use crate::model::{Detail, DetailInput};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Default cap on concurrent detail writes.
pub const DEFAULT_MAX_CONCURRENT_WRITES: usize = 10;

/// Single-record persistence consumed by the ingester. Each call is expected
/// to commit atomically on its own. Calls are blocking and are run on the
/// blocking thread pool.
pub trait DetailStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + 'static;

    /// Persist `detail`, assigning its id on success.
    fn create_detail(&self, detail: &mut Detail) -> Result<(), Self::Error>;
}

/// Tally of one ingest call. `created + failed` equals the number of
/// records handed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    #[serde(rename = "success")]
    pub created: u64,
    #[serde(rename = "fail")]
    pub failed: u64,
}

impl IngestOutcome {
    pub fn total(&self) -> u64 {
        self.created + self.failed
    }

    /// No record failed.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

pub struct BatchIngester<S> {
    store: Arc<S>,
    max_concurrent_writes: usize,
}

impl<S> Clone for BatchIngester<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_concurrent_writes: self.max_concurrent_writes,
        }
    }
}

impl<S: DetailStore> BatchIngester<S> {
    /// A bound of zero is raised to one.
    pub fn new(store: Arc<S>, max_concurrent_writes: usize) -> Self {
        Self {
            store,
            max_concurrent_writes: max_concurrent_writes.max(1),
        }
    }

    pub fn from_config(store: Arc<S>, cfg: &IngestConfig) -> Self {
        Self::new(store, cfg.max_concurrent_writes)
    }

    pub fn max_concurrent_writes(&self) -> usize {
        self.max_concurrent_writes
    }

    /// Bind every record to `run_id`, normalize it and persist it.
    pub async fn ingest(&self, run_id: i64, details: Vec<DetailInput>) -> IngestOutcome {
        let total = details.len() as u64;
        let started = Instant::now();
        let sem = Arc::new(Semaphore::new(self.max_concurrent_writes));
        let failed = Arc::new(AtomicU64::new(0));
        let mut join_set = JoinSet::new();

        for (index, input) in details.into_iter().enumerate() {
            let permit = Arc::clone(&sem)
                .acquire_owned()
                .await
                .expect("ingest semaphore is never closed");
            let store = Arc::clone(&self.store);
            let failed = Arc::clone(&failed);
            join_set.spawn_blocking(move || {
                let _permit = permit;
                write_one(store.as_ref(), run_id, index, input, &failed);
            });
        }

        while let Some(res) = join_set.join_next().await {
            if let Err(e) = res {
                failed.fetch_add(1, Ordering::Relaxed);
                warn!(run_id, error = %e, "detail writer task aborted");
            }
        }

        let failed = failed.load(Ordering::Relaxed);
        let outcome = IngestOutcome {
            created: total - failed,
            failed,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if outcome.is_complete() {
            info!(run_id, created = outcome.created, elapsed_ms, "ingested details");
        } else {
            warn!(
                run_id,
                created = outcome.created,
                failed = outcome.failed,
                elapsed_ms,
                "ingested details with failures"
            );
        }
        outcome
    }
}

fn write_one<S: DetailStore>(
    store: &S,
    run_id: i64,
    index: usize,
    input: DetailInput,
    failed: &AtomicU64,
) {
    let mut detail = match input.bind(run_id) {
        Ok(d) => d,
        Err(e) => {
            failed.fetch_add(1, Ordering::Relaxed);
            warn!(run_id, index, error = %e, "rejected detail");
            return;
        }
    };
    match store.create_detail(&mut detail) {
        Ok(()) => debug!(run_id, index, detail_id = detail.id, "created detail"),
        Err(e) => {
            failed.fetch_add(1, Ordering::Relaxed);
            warn!(run_id, index, error = %e, "failed to create detail");
        }
    }
}
