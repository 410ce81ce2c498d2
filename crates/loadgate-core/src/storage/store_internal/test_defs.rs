//! Test definition read/write paths. Thresholds are encoded right before
//! each write and decoded right after each read.

use super::{now_rfc3339, parse_opt_ts};
use crate::model::{normalize_name, Test};
use crate::status::StatusCode;
use crate::storage::sort::Page;
use crate::storage::store::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

const SELECT_TEST: &str = "SELECT id, project_id, name, description, status, thresholds, \
     fail_on_error, created_at, updated_at FROM tests";

/// Row mapping leaves the thresholds column raw; [`decode_row`] finishes it.
fn row_to_test(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Test, String)> {
    let status: String = row.get(4)?;
    let thresholds: String = row.get(5)?;
    let test = Test {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: StatusCode::from_str_lenient(&status),
        thresholds: Default::default(),
        fail_on_error: row.get(6)?,
        created_at: parse_opt_ts(7, row.get(7)?)?,
        updated_at: parse_opt_ts(8, row.get(8)?)?,
    };
    Ok((test, thresholds))
}

fn decode_row((mut test, thresholds): (Test, String)) -> Result<Test, StoreError> {
    test.thresholds = Test::decode_thresholds(&thresholds)?;
    Ok(test)
}

pub(crate) fn create_test_impl(conn: &Connection, test: &mut Test) -> Result<(), StoreError> {
    test.prepare_create()?;
    let thresholds = test.encode_thresholds()?;
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO tests(project_id, name, description, status, thresholds, fail_on_error, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            test.project_id,
            test.name,
            test.description,
            test.status.as_str(),
            thresholds,
            test.fail_on_error,
            now
        ],
    )?;
    test.id = conn.last_insert_rowid();
    let ts = parse_opt_ts(0, Some(now))?;
    test.created_at = ts;
    test.updated_at = ts;
    debug!(test_id = test.id, project_id = test.project_id, name = %test.name, "created test");
    Ok(())
}

pub(crate) fn update_test_impl(conn: &Connection, test: &mut Test) -> Result<(), StoreError> {
    let stored = find_test_impl(conn, test.id)?
        .ok_or_else(|| StoreError::not_found("test", test.id))?;
    test.prepare_update(&stored.name)?;
    let thresholds = test.encode_thresholds()?;
    let now = now_rfc3339();
    conn.execute(
        "UPDATE tests SET project_id = ?1, name = ?2, description = ?3, status = ?4,
             thresholds = ?5, fail_on_error = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            test.project_id,
            test.name,
            test.description,
            test.status.as_str(),
            thresholds,
            test.fail_on_error,
            now,
            test.id
        ],
    )?;
    test.created_at = stored.created_at;
    test.updated_at = parse_opt_ts(0, Some(now))?;
    debug!(test_id = test.id, status = %test.status, "updated test");
    Ok(())
}

pub(crate) fn find_test_impl(conn: &Connection, id: i64) -> Result<Option<Test>, StoreError> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_TEST), params![id], row_to_test)
        .optional()?
        .map(decode_row)
        .transpose()
}

pub(crate) fn find_test_by_name_impl(
    conn: &Connection,
    name: &str,
) -> Result<Option<Test>, StoreError> {
    conn.query_row(
        &format!("{} WHERE name = ?1", SELECT_TEST),
        params![normalize_name(name)],
        row_to_test,
    )
    .optional()?
    .map(decode_row)
    .transpose()
}

pub(crate) fn list_tests_impl(
    conn: &Connection,
    project_id: i64,
    page: Page,
) -> Result<Vec<Test>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE project_id = ?1 ORDER BY name DESC LIMIT ?2 OFFSET ?3",
        SELECT_TEST
    ))?;
    let rows = stmt
        .query_map(params![project_id, page.limit(), page.offset()], row_to_test)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(decode_row).collect()
}
