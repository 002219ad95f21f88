//! Collaborator lookups and the inspection/collaborator join table

use serde::Serialize;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;
use vistoria_common::Result;

use super::parse_uuid;

/// Field collaborator attached to teams and inspections
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

fn map_collaborator(row: &sqlx::sqlite::SqliteRow) -> Result<Collaborator> {
    let guid: String = row.get("guid");
    Ok(Collaborator {
        id: parse_uuid(&guid)?,
        name: row.get("name"),
        active: row.get::<i64, _>("active") != 0,
    })
}

/// Load collaborators by id set (used for existence validation)
pub async fn find_by_ids(conn: &mut SqliteConnection, ids: &[Uuid]) -> Result<Vec<Collaborator>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT guid, name, active FROM collaborators WHERE guid IN ({})",
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id.to_string());
    }

    let rows = query.fetch_all(conn).await?;
    rows.iter().map(map_collaborator).collect()
}

/// Load the collaborators attached to an inspection
pub async fn fetch_for_inspection(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
) -> Result<Vec<Collaborator>> {
    let rows = sqlx::query(
        r#"
        SELECT c.guid, c.name, c.active
        FROM collaborators c
        JOIN inspection_collaborators ic ON ic.collaborator_id = c.guid
        WHERE ic.inspection_id = ?
        ORDER BY c.name
        "#,
    )
    .bind(inspection_id.to_string())
    .fetch_all(conn)
    .await?;

    rows.iter().map(map_collaborator).collect()
}

/// Replace the collaborator set of an inspection wholesale
pub async fn replace_for_inspection(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    collaborator_ids: &[Uuid],
) -> Result<()> {
    sqlx::query("DELETE FROM inspection_collaborators WHERE inspection_id = ?")
        .bind(inspection_id.to_string())
        .execute(&mut *conn)
        .await?;

    for collaborator_id in collaborator_ids {
        sqlx::query(
            "INSERT INTO inspection_collaborators (inspection_id, collaborator_id) VALUES (?, ?)",
        )
        .bind(inspection_id.to_string())
        .bind(collaborator_id.to_string())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
