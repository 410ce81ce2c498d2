//! Project read/write paths.

use super::{now_rfc3339, parse_opt_ts, to_count};
use crate::model::{normalize_name, Project};
use crate::storage::sort::{Page, ProjectSort};
use crate::storage::store::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

const SELECT_PROJECT: &str =
    "SELECT id, name, description, created_at, updated_at FROM projects";

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_opt_ts(3, row.get(3)?)?,
        updated_at: parse_opt_ts(4, row.get(4)?)?,
    })
}

pub(crate) fn create_project_impl(
    conn: &Connection,
    project: &mut Project,
) -> Result<(), StoreError> {
    project.prepare_create();
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO projects(name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![project.name, project.description, now],
    )?;
    project.id = conn.last_insert_rowid();
    let ts = parse_opt_ts(0, Some(now))?;
    project.created_at = ts;
    project.updated_at = ts;
    debug!(project_id = project.id, name = %project.name, "created project");
    Ok(())
}

pub(crate) fn update_project_impl(
    conn: &Connection,
    project: &mut Project,
) -> Result<(), StoreError> {
    let stored = find_project_impl(conn, project.id)?
        .ok_or_else(|| StoreError::not_found("project", project.id))?;
    project.prepare_update(&stored.name)?;
    let now = now_rfc3339();
    conn.execute(
        "UPDATE projects SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
        params![project.name, project.description, now, project.id],
    )?;
    project.created_at = stored.created_at;
    project.updated_at = parse_opt_ts(0, Some(now))?;
    Ok(())
}

pub(crate) fn find_project_impl(
    conn: &Connection,
    id: i64,
) -> Result<Option<Project>, StoreError> {
    Ok(conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_PROJECT),
            params![id],
            row_to_project,
        )
        .optional()?)
}

pub(crate) fn find_project_by_name_impl(
    conn: &Connection,
    name: &str,
) -> Result<Option<Project>, StoreError> {
    Ok(conn
        .query_row(
            &format!("{} WHERE name = ?1", SELECT_PROJECT),
            params![normalize_name(name)],
            row_to_project,
        )
        .optional()?)
}

pub(crate) fn count_projects_impl(conn: &Connection) -> Result<u64, StoreError> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))?;
    Ok(to_count(n))
}

pub(crate) fn list_projects_impl(
    conn: &Connection,
    page: Page,
    sort: ProjectSort,
) -> Result<Vec<Project>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY {} LIMIT ?1 OFFSET ?2",
        SELECT_PROJECT,
        sort.order_by()
    ))?;
    let rows = stmt
        .query_map(params![page.limit(), page.offset()], row_to_project)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
