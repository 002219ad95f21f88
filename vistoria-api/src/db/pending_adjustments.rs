//! Pending adjustment (non-conformity remediation record) persistence

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;
use vistoria_common::{PendingStatus, Result};

use super::parse_uuid;

/// Remediation record opened when an inspection finalizes with at least one
/// non-conformity. One-to-one with the inspection; never deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAdjustment {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub status: PendingStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by_user_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub resolution_evidence_path: Option<String>,
}

fn map_pending(row: &sqlx::sqlite::SqliteRow) -> Result<PendingAdjustment> {
    let guid: String = row.get("guid");
    let inspection_id: String = row.get("inspection_id");
    let status: String = row.get("status");
    let resolved_by: Option<String> = row.get("resolved_by_user_id");

    Ok(PendingAdjustment {
        id: parse_uuid(&guid)?,
        inspection_id: parse_uuid(&inspection_id)?,
        status: status.parse()?,
        resolved_at: row.get("resolved_at"),
        resolved_by_user_id: resolved_by.as_deref().map(parse_uuid).transpose()?,
        resolution_notes: row.get("resolution_notes"),
        resolution_evidence_path: row.get("resolution_evidence_path"),
    })
}

const PENDING_COLUMNS: &str = "guid, inspection_id, status, resolved_at, resolved_by_user_id, \
     resolution_notes, resolution_evidence_path";

/// Load the pending adjustment of an inspection, if any
pub async fn fetch_for_inspection(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
) -> Result<Option<PendingAdjustment>> {
    let sql = format!(
        "SELECT {} FROM pending_adjustments WHERE inspection_id = ?",
        PENDING_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(inspection_id.to_string())
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_pending).transpose()
}

/// Create the remediation record, or reset an existing one back to pending.
///
/// Called by finalize when a non-conformity is present; re-finalizing an
/// inspection that was previously adjusted reopens the record.
pub async fn upsert_pending(conn: &mut SqliteConnection, inspection_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pending_adjustments (guid, inspection_id, status, created_at, updated_at)
        VALUES (?, ?, 'PENDENTE', ?, ?)
        ON CONFLICT(inspection_id) DO UPDATE SET
            status = 'PENDENTE',
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(inspection_id.to_string())
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Mark the remediation record resolved, creating it if it does not exist
/// yet.
pub async fn mark_resolved(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    resolved_by_user_id: Uuid,
    resolution_notes: &str,
    resolution_evidence_path: Option<&str>,
    resolved_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pending_adjustments (
            guid, inspection_id, status, resolved_at, resolved_by_user_id,
            resolution_notes, resolution_evidence_path, created_at, updated_at
        ) VALUES (?, ?, 'RESOLVIDA', ?, ?, ?, ?, ?, ?)
        ON CONFLICT(inspection_id) DO UPDATE SET
            status = 'RESOLVIDA',
            resolved_at = excluded.resolved_at,
            resolved_by_user_id = excluded.resolved_by_user_id,
            resolution_notes = excluded.resolution_notes,
            resolution_evidence_path = excluded.resolution_evidence_path,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(inspection_id.to_string())
    .bind(resolved_at)
    .bind(resolved_by_user_id.to_string())
    .bind(resolution_notes)
    .bind(resolution_evidence_path)
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}
