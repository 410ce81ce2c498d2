//! SqliteStore: durable storage for projects, tests, runs and details.
//!
//! The store is where the model's storage hooks run. Writes call
//! `prepare_*` and encode JSON columns right before the statement, and the
//! encoded text is dropped with the statement. Reads decode JSON columns
//! right after the row is fetched, so callers only ever see typed maps.

use super::schema::SCHEMA;
use super::sort::{DetailSort, Page, ProjectSort, RunSort};
use super::store_internal::{details, projects, runs, test_defs};
use crate::codec::CodecError;
use crate::ingest::DetailStore;
use crate::model::{Detail, ModelError, Project, Run, Test};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("store connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// SQLite-backed result store. Cloning shares the connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a file-backed store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // Projects

    pub fn create_project(&self, project: &mut Project) -> Result<(), StoreError> {
        projects::create_project_impl(&*self.conn()?, project)
    }

    pub fn update_project(&self, project: &mut Project) -> Result<(), StoreError> {
        projects::update_project_impl(&*self.conn()?, project)
    }

    pub fn find_project(&self, id: i64) -> Result<Option<Project>, StoreError> {
        projects::find_project_impl(&*self.conn()?, id)
    }

    pub fn find_project_by_name(&self, name: &str) -> Result<Option<Project>, StoreError> {
        projects::find_project_by_name_impl(&*self.conn()?, name)
    }

    pub fn count_projects(&self) -> Result<u64, StoreError> {
        projects::count_projects_impl(&*self.conn()?)
    }

    /// `ProjectSort::default()` lists by name, descending.
    pub fn list_projects(
        &self,
        page: Page,
        sort: ProjectSort,
    ) -> Result<Vec<Project>, StoreError> {
        projects::list_projects_impl(&*self.conn()?, page, sort)
    }

    // Tests

    pub fn create_test(&self, test: &mut Test) -> Result<(), StoreError> {
        test_defs::create_test_impl(&*self.conn()?, test)
    }

    /// Persist name, description, thresholds, fail-on-error and the derived
    /// status of an existing test.
    pub fn update_test(&self, test: &mut Test) -> Result<(), StoreError> {
        test_defs::update_test_impl(&*self.conn()?, test)
    }

    pub fn find_test(&self, id: i64) -> Result<Option<Test>, StoreError> {
        test_defs::find_test_impl(&*self.conn()?, id)
    }

    pub fn find_test_by_name(&self, name: &str) -> Result<Option<Test>, StoreError> {
        test_defs::find_test_by_name_impl(&*self.conn()?, name)
    }

    pub fn list_tests(&self, project_id: i64, page: Page) -> Result<Vec<Test>, StoreError> {
        test_defs::list_tests_impl(&*self.conn()?, project_id, page)
    }

    // Runs

    /// Insert the run with its latency distribution and histogram in one
    /// transaction.
    pub fn create_run(&self, run: &mut Run) -> Result<(), StoreError> {
        runs::create_run_impl(&mut *self.conn()?, run)
    }

    /// Rewrite an existing run, replacing its child rows.
    pub fn update_run(&self, run: &mut Run) -> Result<(), StoreError> {
        runs::update_run_impl(&mut *self.conn()?, run)
    }

    pub fn find_run(&self, id: i64) -> Result<Option<Run>, StoreError> {
        runs::find_run_impl(&*self.conn()?, id)
    }

    /// Most recent run of a test by date.
    pub fn find_latest_run(&self, test_id: i64) -> Result<Option<Run>, StoreError> {
        runs::find_latest_run_impl(&*self.conn()?, test_id)
    }

    pub fn count_runs(&self, test_id: i64) -> Result<u64, StoreError> {
        runs::count_runs_impl(&*self.conn()?, test_id)
    }

    /// List runs of a test. Child rows are loaded only when `populate` is set.
    pub fn list_runs(
        &self,
        test_id: i64,
        page: Page,
        sort: RunSort,
        populate: bool,
    ) -> Result<Vec<Run>, StoreError> {
        runs::list_runs_impl(&*self.conn()?, test_id, page, sort, populate)
    }

    // Details

    pub fn find_detail(&self, id: i64) -> Result<Option<Detail>, StoreError> {
        details::find_detail_impl(&*self.conn()?, id)
    }

    pub fn update_detail(&self, detail: &mut Detail) -> Result<(), StoreError> {
        details::update_detail_impl(&*self.conn()?, detail)
    }

    pub fn count_details(&self, run_id: i64) -> Result<u64, StoreError> {
        details::count_details_impl(&*self.conn()?, run_id)
    }

    pub fn list_details(
        &self,
        run_id: i64,
        page: Page,
        sort: DetailSort,
    ) -> Result<Vec<Detail>, StoreError> {
        details::list_details_impl(&*self.conn()?, run_id, page, sort)
    }

    /// Every detail of a run in insertion order, unpaged.
    pub fn list_all_details(&self, run_id: i64) -> Result<Vec<Detail>, StoreError> {
        details::list_all_details_impl(&*self.conn()?, run_id)
    }
}

impl DetailStore for SqliteStore {
    type Error = StoreError;

    fn create_detail(&self, detail: &mut Detail) -> Result<(), StoreError> {
        details::create_detail_impl(&*self.conn()?, detail)
    }
}
