//! Checklist read operations
//!
//! The core only reads checklist templates: inspection creation snapshots the
//! active item set, and finalize consults the photo-on-non-conformity flag.
//! Checklist management itself lives outside this service.

use serde::Serialize;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;
use vistoria_common::{ModuleType, Result};

use super::parse_uuid;

/// Checklist template header
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: Uuid,
    pub module: ModuleType,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

/// One item of a checklist template
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: Uuid,
    pub checklist_id: Uuid,
    pub section_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub sort_order: i64,
    pub requires_photo_on_non_conformity: bool,
    pub active: bool,
}

fn map_item(row: &sqlx::sqlite::SqliteRow) -> Result<ChecklistItem> {
    let id: String = row.get("guid");
    let checklist_id: String = row.get("checklist_id");
    let section_id: Option<String> = row.get("section_id");

    Ok(ChecklistItem {
        id: parse_uuid(&id)?,
        checklist_id: parse_uuid(&checklist_id)?,
        section_id: section_id.as_deref().map(parse_uuid).transpose()?,
        title: row.get("title"),
        description: row.get("description"),
        sort_order: row.get("sort_order"),
        requires_photo_on_non_conformity: row.get::<i64, _>("requires_photo_on_non_conformity") != 0,
        active: row.get::<i64, _>("active") != 0,
    })
}

/// Load a checklist header by id
pub async fn fetch_checklist(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Checklist>> {
    let row = sqlx::query(
        "SELECT guid, module, name, description, active FROM checklists WHERE guid = ?",
    )
    .bind(id.to_string())
    .fetch_optional(conn)
    .await?;

    match row {
        Some(row) => {
            let guid: String = row.get("guid");
            let module: String = row.get("module");
            Ok(Some(Checklist {
                id: parse_uuid(&guid)?,
                module: module.parse()?,
                name: row.get("name"),
                description: row.get("description"),
                active: row.get::<i64, _>("active") != 0,
            }))
        }
        None => Ok(None),
    }
}

/// Load the active items of a checklist, in display order.
///
/// This is the set snapshotted into inspection items at creation time.
pub async fn fetch_active_items(
    conn: &mut SqliteConnection,
    checklist_id: Uuid,
) -> Result<Vec<ChecklistItem>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, checklist_id, section_id, title, description, sort_order,
               requires_photo_on_non_conformity, active
        FROM checklist_items
        WHERE checklist_id = ? AND active = 1
        ORDER BY sort_order
        "#,
    )
    .bind(checklist_id.to_string())
    .fetch_all(conn)
    .await?;

    rows.iter().map(map_item).collect()
}
