//! Inspection item (answer slot) persistence

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;
use vistoria_common::{ChecklistAnswer, Result};

use super::evidences::Evidence;
use super::parse_uuid;

/// One answer slot, created per checklist item when the inspection is created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionItem {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub checklist_item_id: Uuid,
    pub answer: Option<ChecklistAnswer>,
    pub notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by_user_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub resolution_evidence_path: Option<String>,
}

/// Checklist item snapshot data carried alongside each answer slot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemSummary {
    pub id: Uuid,
    pub title: String,
    pub sort_order: i64,
    pub requires_photo_on_non_conformity: bool,
}

/// Answer slot with its checklist item data and scoped evidence
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionItemDetail {
    #[serde(flatten)]
    pub item: InspectionItem,
    pub checklist_item: ChecklistItemSummary,
    pub evidences: Vec<Evidence>,
}

fn map_item(row: &sqlx::sqlite::SqliteRow) -> Result<InspectionItem> {
    let guid: String = row.get("guid");
    let inspection_id: String = row.get("inspection_id");
    let checklist_item_id: String = row.get("checklist_item_id");
    let answer: Option<String> = row.get("answer");
    let resolved_by: Option<String> = row.get("resolved_by_user_id");

    Ok(InspectionItem {
        id: parse_uuid(&guid)?,
        inspection_id: parse_uuid(&inspection_id)?,
        checklist_item_id: parse_uuid(&checklist_item_id)?,
        answer: answer.as_deref().map(str::parse).transpose()?,
        notes: row.get("notes"),
        resolved_at: row.get("resolved_at"),
        resolved_by_user_id: resolved_by.as_deref().map(parse_uuid).transpose()?,
        resolution_notes: row.get("resolution_notes"),
        resolution_evidence_path: row.get("resolution_evidence_path"),
    })
}

const ITEM_COLUMNS: &str = "guid, inspection_id, checklist_item_id, answer, notes, \
     resolved_at, resolved_by_user_id, resolution_notes, resolution_evidence_path";

/// Create an empty answer slot for one checklist item
pub async fn insert(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    checklist_item_id: Uuid,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO inspection_items (guid, inspection_id, checklist_item_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(inspection_id.to_string())
    .bind(checklist_item_id.to_string())
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(id)
}

/// Load one answer slot by id
pub async fn fetch(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<InspectionItem>> {
    let sql = format!("SELECT {} FROM inspection_items WHERE guid = ?", ITEM_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_item).transpose()
}

/// Resolve an answer slot by its checklist item (sync merge key)
pub async fn fetch_by_checklist_item(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    checklist_item_id: Uuid,
) -> Result<Option<InspectionItem>> {
    let sql = format!(
        "SELECT {} FROM inspection_items WHERE inspection_id = ? AND checklist_item_id = ?",
        ITEM_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(inspection_id.to_string())
        .bind(checklist_item_id.to_string())
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_item).transpose()
}

/// Update one slot's answer and notes in place
pub async fn update_answer(
    conn: &mut SqliteConnection,
    id: Uuid,
    answer: Option<ChecklistAnswer>,
    notes: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE inspection_items SET answer = ?, notes = ?, updated_at = ? WHERE guid = ?")
        .bind(answer.map(|a| a.as_str()))
        .bind(notes)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

/// Load the answer slots of an inspection joined with their checklist item
/// snapshot data, in checklist display order. Evidence is attached by the
/// aggregate loader.
pub async fn fetch_details(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
) -> Result<Vec<InspectionItemDetail>> {
    let rows = sqlx::query(
        r#"
        SELECT ii.guid, ii.inspection_id, ii.checklist_item_id, ii.answer, ii.notes,
               ii.resolved_at, ii.resolved_by_user_id, ii.resolution_notes,
               ii.resolution_evidence_path,
               ci.title, ci.sort_order, ci.requires_photo_on_non_conformity
        FROM inspection_items ii
        JOIN checklist_items ci ON ci.guid = ii.checklist_item_id
        WHERE ii.inspection_id = ?
        ORDER BY ci.sort_order
        "#,
    )
    .bind(inspection_id.to_string())
    .fetch_all(conn)
    .await?;

    rows.iter()
        .map(|row| {
            let item = map_item(row)?;
            let checklist_item = ChecklistItemSummary {
                id: item.checklist_item_id,
                title: row.get("title"),
                sort_order: row.get("sort_order"),
                requires_photo_on_non_conformity: row
                    .get::<i64, _>("requires_photo_on_non_conformity")
                    != 0,
            };
            Ok(InspectionItemDetail {
                item,
                checklist_item,
                evidences: Vec::new(),
            })
        })
        .collect()
}
