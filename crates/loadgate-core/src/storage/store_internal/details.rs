//! Detail read/write paths. Each create is a single-row autocommit insert.

use super::{format_ts, now_rfc3339, parse_opt_ts, to_count};
use crate::model::Detail;
use crate::storage::sort::{DetailSort, Page};
use crate::storage::store::StoreError;
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_DETAIL: &str = "SELECT id, run_id, timestamp, latency, error, status FROM details";

fn row_to_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<Detail> {
    Ok(Detail {
        id: row.get(0)?,
        run_id: row.get(1)?,
        timestamp: parse_opt_ts(2, row.get(2)?)?,
        latency: row.get(3)?,
        error: row.get(4)?,
        status: row.get(5)?,
    })
}

pub(crate) fn create_detail_impl(conn: &Connection, detail: &mut Detail) -> Result<(), StoreError> {
    detail.prepare_write()?;
    conn.execute(
        "INSERT INTO details(run_id, timestamp, latency, error, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            detail.run_id,
            detail.timestamp.as_ref().map(format_ts),
            detail.latency,
            detail.error,
            detail.status,
            now_rfc3339(),
        ],
    )?;
    detail.id = conn.last_insert_rowid();
    Ok(())
}

pub(crate) fn update_detail_impl(conn: &Connection, detail: &mut Detail) -> Result<(), StoreError> {
    if find_detail_impl(conn, detail.id)?.is_none() {
        return Err(StoreError::not_found("detail", detail.id));
    }
    detail.prepare_write()?;
    conn.execute(
        "UPDATE details SET run_id = ?1, timestamp = ?2, latency = ?3, error = ?4, status = ?5
         WHERE id = ?6",
        params![
            detail.run_id,
            detail.timestamp.as_ref().map(format_ts),
            detail.latency,
            detail.error,
            detail.status,
            detail.id,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_detail_impl(conn: &Connection, id: i64) -> Result<Option<Detail>, StoreError> {
    Ok(conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_DETAIL),
            params![id],
            row_to_detail,
        )
        .optional()?)
}

pub(crate) fn count_details_impl(conn: &Connection, run_id: i64) -> Result<u64, StoreError> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM details WHERE run_id = ?1",
        params![run_id],
        |r| r.get(0),
    )?;
    Ok(to_count(n))
}

pub(crate) fn list_details_impl(
    conn: &Connection,
    run_id: i64,
    page: Page,
    sort: DetailSort,
) -> Result<Vec<Detail>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE run_id = ?1 ORDER BY {} LIMIT ?2 OFFSET ?3",
        SELECT_DETAIL,
        sort.order_by()
    ))?;
    let rows = stmt
        .query_map(params![run_id, page.limit(), page.offset()], row_to_detail)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn list_all_details_impl(
    conn: &Connection,
    run_id: i64,
) -> Result<Vec<Detail>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE run_id = ?1 ORDER BY id ASC",
        SELECT_DETAIL
    ))?;
    let rows = stmt
        .query_map(params![run_id], row_to_detail)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
