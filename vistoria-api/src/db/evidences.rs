//! Evidence (photo) persistence and the sync dedupe matcher

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;
use vistoria_common::Result;

use super::parse_uuid;

/// A photo attached to an inspection or one of its items. Immutable once
/// created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub inspection_item_id: Option<Uuid>,
    // Legacy local-storage fields; read for dedupe, never written anymore
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    // Gateway-hosted asset fields
    pub cloudinary_public_id: Option<String>,
    pub url: Option<String>,
    pub bytes: Option<i64>,
    pub format: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub uploaded_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new evidence row
#[derive(Debug, Clone)]
pub struct NewEvidence {
    pub inspection_id: Uuid,
    pub inspection_item_id: Option<Uuid>,
    pub cloudinary_public_id: Option<String>,
    pub url: Option<String>,
    pub bytes: Option<i64>,
    pub format: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub uploaded_by_user_id: Uuid,
}

fn map_evidence(row: &sqlx::sqlite::SqliteRow) -> Result<Evidence> {
    let guid: String = row.get("guid");
    let inspection_id: String = row.get("inspection_id");
    let item_id: Option<String> = row.get("inspection_item_id");
    let uploaded_by: String = row.get("uploaded_by_user_id");

    Ok(Evidence {
        id: parse_uuid(&guid)?,
        inspection_id: parse_uuid(&inspection_id)?,
        inspection_item_id: item_id.as_deref().map(parse_uuid).transpose()?,
        file_path: row.get("file_path"),
        file_name: row.get("file_name"),
        mime_type: row.get("mime_type"),
        size: row.get("size"),
        cloudinary_public_id: row.get("cloudinary_public_id"),
        url: row.get("url"),
        bytes: row.get("bytes"),
        format: row.get("format"),
        width: row.get("width"),
        height: row.get("height"),
        uploaded_by_user_id: parse_uuid(&uploaded_by)?,
        created_at: row.get("created_at"),
    })
}

const EVIDENCE_COLUMNS: &str = "guid, inspection_id, inspection_item_id, file_path, file_name, \
     mime_type, size, cloudinary_public_id, url, bytes, format, width, height, \
     uploaded_by_user_id, created_at";

/// Insert an evidence row, returning its id
pub async fn insert(conn: &mut SqliteConnection, new: &NewEvidence) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO evidences (
            guid, inspection_id, inspection_item_id,
            cloudinary_public_id, url, bytes, format, width, height,
            file_path, file_name, mime_type, size,
            uploaded_by_user_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new.inspection_id.to_string())
    .bind(new.inspection_item_id.map(|v| v.to_string()))
    .bind(&new.cloudinary_public_id)
    .bind(&new.url)
    .bind(new.bytes)
    .bind(&new.format)
    .bind(new.width)
    .bind(new.height)
    .bind(&new.file_path)
    .bind(&new.file_name)
    .bind(&new.mime_type)
    .bind(new.size)
    .bind(new.uploaded_by_user_id.to_string())
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(id)
}

/// Load one evidence row by id
pub async fn fetch(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Evidence>> {
    let sql = format!("SELECT {} FROM evidences WHERE guid = ?", EVIDENCE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_evidence).transpose()
}

/// Load all evidence of an inspection (both item-scoped and general)
pub async fn fetch_for_inspection(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
) -> Result<Vec<Evidence>> {
    let sql = format!(
        "SELECT {} FROM evidences WHERE inspection_id = ? ORDER BY created_at",
        EVIDENCE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(inspection_id.to_string())
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_evidence).collect()
}

/// Count evidence rows attached to one answer slot
pub async fn count_for_item(conn: &mut SqliteConnection, item_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM evidences WHERE inspection_item_id = ?",
    )
    .bind(item_id.to_string())
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// Reference used to dedupe an incoming sync evidence against existing rows
#[derive(Debug, Clone, Default)]
pub struct EvidenceMatchKeys {
    pub cloudinary_public_id: Option<String>,
    pub url: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub size: Option<i64>,
}

/// Find an existing evidence row matching an incoming sync reference.
///
/// Matching strategies are tried in priority order, stopping at the first
/// hit: gateway public id, then URL, then the legacy composite key used
/// before the system migrated to gateway-hosted assets.
pub async fn find_matching(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    inspection_item_id: Option<Uuid>,
    keys: &EvidenceMatchKeys,
) -> Result<Option<Uuid>> {
    if let Some(public_id) = &keys.cloudinary_public_id {
        let found = match_by_column(conn, inspection_id, inspection_item_id, "cloudinary_public_id", public_id).await?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if let Some(url) = &keys.url {
        let found = match_by_column(conn, inspection_id, inspection_item_id, "url", url).await?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if let (Some(file_path), Some(file_name), Some(size)) =
        (&keys.file_path, &keys.file_name, keys.size)
    {
        let sql = "SELECT guid FROM evidences \
                   WHERE inspection_id = ? AND inspection_item_id IS ? \
                   AND file_path = ? AND file_name = ? AND size = ?";
        let row: Option<String> = sqlx::query_scalar(sql)
            .bind(inspection_id.to_string())
            .bind(inspection_item_id.map(|v| v.to_string()))
            .bind(file_path)
            .bind(file_name)
            .bind(size)
            .fetch_optional(conn)
            .await?;
        if let Some(guid) = row {
            return Ok(Some(parse_uuid(&guid)?));
        }
    }

    Ok(None)
}

async fn match_by_column(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    inspection_item_id: Option<Uuid>,
    column: &str,
    value: &str,
) -> Result<Option<Uuid>> {
    // column is a compile-time constant name, never user input
    let sql = format!(
        "SELECT guid FROM evidences WHERE inspection_id = ? AND inspection_item_id IS ? AND {} = ?",
        column
    );
    let row: Option<String> = sqlx::query_scalar(&sql)
        .bind(inspection_id.to_string())
        .bind(inspection_item_id.map(|v| v.to_string()))
        .bind(value)
        .fetch_optional(conn)
        .await?;

    row.as_deref().map(parse_uuid).transpose()
}
