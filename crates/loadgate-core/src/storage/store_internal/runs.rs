//! Run read/write paths, including latency distribution and histogram rows.

use super::{format_ts, now_rfc3339, parse_ts, to_count};
use crate::model::nanos;
use crate::model::run::RunColumns;
use crate::model::{Bucket, LatencyDistribution, Run};
use crate::status::StatusCode;
use crate::storage::sort::{Page, RunSort};
use crate::storage::store::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

const SELECT_RUN: &str = "SELECT id, test_id, date, count, total, average, fastest, slowest, \
     rps, status, options, error_dist, status_code_dist FROM runs";

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Run, RunColumns)> {
    let date: String = row.get(2)?;
    let status: String = row.get(9)?;
    let run = Run {
        id: row.get(0)?,
        test_id: row.get(1)?,
        date: parse_ts(2, &date)?,
        count: to_count(row.get(3)?),
        total: nanos::from_i64(row.get(4)?),
        average: nanos::from_i64(row.get(5)?),
        fastest: nanos::from_i64(row.get(6)?),
        slowest: nanos::from_i64(row.get(7)?),
        rps: row.get(8)?,
        status: StatusCode::from_str_lenient(&status),
        ..Default::default()
    };
    let columns = RunColumns {
        options: row.get(10)?,
        error_dist: row.get(11)?,
        status_code_dist: row.get(12)?,
    };
    Ok((run, columns))
}

fn finish_run(
    conn: &Connection,
    (mut run, columns): (Run, RunColumns),
    populate: bool,
) -> Result<Run, StoreError> {
    run.decode_columns(columns)?;
    if populate {
        run.latency_distribution = load_latency_distribution(conn, run.id)?;
        run.histogram = load_histogram(conn, run.id)?;
    }
    Ok(run)
}

fn load_latency_distribution(
    conn: &Connection,
    run_id: i64,
) -> Result<Vec<LatencyDistribution>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT percentage, latency FROM latency_distributions WHERE run_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map(params![run_id], |row| {
            Ok(LatencyDistribution {
                percentage: row.get(0)?,
                latency: nanos::from_i64(row.get(1)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn load_histogram(conn: &Connection, run_id: i64) -> Result<Vec<Bucket>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT mark, count, frequency FROM buckets WHERE run_id = ?1 ORDER BY id ASC")?;
    let rows = stmt
        .query_map(params![run_id], |row| {
            Ok(Bucket {
                mark: row.get(0)?,
                count: to_count(row.get(1)?),
                frequency: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn count_to_sql(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Insert the latency distribution and histogram rows of `run` under `run_id`.
fn insert_children(conn: &Connection, run_id: i64, run: &Run) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "INSERT INTO latency_distributions(run_id, percentage, latency) VALUES (?1, ?2, ?3)",
    )?;
    for l in &run.latency_distribution {
        stmt.execute(params![run_id, l.percentage, nanos::to_i64(l.latency)])?;
    }

    let mut stmt = conn
        .prepare("INSERT INTO buckets(run_id, mark, count, frequency) VALUES (?1, ?2, ?3, ?4)")?;
    for b in &run.histogram {
        stmt.execute(params![run_id, b.mark, count_to_sql(b.count), b.frequency])?;
    }
    Ok(())
}

pub(crate) fn create_run_impl(conn: &mut Connection, run: &mut Run) -> Result<(), StoreError> {
    run.prepare_write()?;
    let columns = run.encode_columns()?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO runs(test_id, date, count, total, average, fastest, slowest, rps, status,
             options, error_dist, status_code_dist, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            run.test_id,
            format_ts(&run.date),
            count_to_sql(run.count),
            nanos::to_i64(run.total),
            nanos::to_i64(run.average),
            nanos::to_i64(run.fastest),
            nanos::to_i64(run.slowest),
            run.rps,
            run.status.as_str(),
            columns.options,
            columns.error_dist,
            columns.status_code_dist,
            now_rfc3339(),
        ],
    )?;
    let run_id = tx.last_insert_rowid();
    insert_children(&tx, run_id, run)?;

    tx.commit()?;
    run.id = run_id;
    debug!(
        run_id,
        test_id = run.test_id,
        status = %run.status,
        latencies = run.latency_distribution.len(),
        buckets = run.histogram.len(),
        "created run"
    );
    Ok(())
}

/// Rewrite an existing run. Status and JSON columns are derived again, and
/// the child rows are replaced with the ones on `run`.
pub(crate) fn update_run_impl(conn: &mut Connection, run: &mut Run) -> Result<(), StoreError> {
    let exists = conn
        .query_row("SELECT 1 FROM runs WHERE id = ?1", params![run.id], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Err(StoreError::not_found("run", run.id));
    }
    run.prepare_write()?;
    let columns = run.encode_columns()?;

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE runs SET test_id = ?1, date = ?2, count = ?3, total = ?4, average = ?5,
             fastest = ?6, slowest = ?7, rps = ?8, status = ?9, options = ?10,
             error_dist = ?11, status_code_dist = ?12
         WHERE id = ?13",
        params![
            run.test_id,
            format_ts(&run.date),
            count_to_sql(run.count),
            nanos::to_i64(run.total),
            nanos::to_i64(run.average),
            nanos::to_i64(run.fastest),
            nanos::to_i64(run.slowest),
            run.rps,
            run.status.as_str(),
            columns.options,
            columns.error_dist,
            columns.status_code_dist,
            run.id,
        ],
    )?;
    tx.execute("DELETE FROM latency_distributions WHERE run_id = ?1", params![run.id])?;
    tx.execute("DELETE FROM buckets WHERE run_id = ?1", params![run.id])?;
    insert_children(&tx, run.id, run)?;
    tx.commit()?;

    debug!(run_id = run.id, status = %run.status, "updated run");
    Ok(())
}

pub(crate) fn find_run_impl(conn: &Connection, id: i64) -> Result<Option<Run>, StoreError> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_RUN), params![id], row_to_run)
        .optional()?
        .map(|row| finish_run(conn, row, true))
        .transpose()
}

pub(crate) fn find_latest_run_impl(
    conn: &Connection,
    test_id: i64,
) -> Result<Option<Run>, StoreError> {
    conn.query_row(
        &format!(
            "{} WHERE test_id = ?1 ORDER BY date DESC, id DESC LIMIT 1",
            SELECT_RUN
        ),
        params![test_id],
        row_to_run,
    )
    .optional()?
    .map(|row| finish_run(conn, row, true))
    .transpose()
}

pub(crate) fn count_runs_impl(conn: &Connection, test_id: i64) -> Result<u64, StoreError> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM runs WHERE test_id = ?1",
        params![test_id],
        |r| r.get(0),
    )?;
    Ok(to_count(n))
}

pub(crate) fn list_runs_impl(
    conn: &Connection,
    test_id: i64,
    page: Page,
    sort: RunSort,
    populate: bool,
) -> Result<Vec<Run>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE test_id = ?1 ORDER BY {} LIMIT ?2 OFFSET ?3",
        SELECT_RUN,
        sort.order_by()
    ))?;
    let rows = stmt
        .query_map(params![test_id, page.limit(), page.offset()], row_to_run)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|row| finish_run(conn, row, populate))
        .collect()
}
