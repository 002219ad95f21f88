//! Inspection persistence and aggregate hydration

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;
use vistoria_common::{InspectionStatus, ModuleType, Result};

use super::collaborators::{self, Collaborator};
use super::evidences::{self, Evidence};
use super::inspection_items::{self, InspectionItemDetail};
use super::parse_uuid;
use super::pending_adjustments::{self, PendingAdjustment};
use super::signatures::{self, Signature};
use crate::types::{InspectionFilters, PaginationQuery};

/// One inspection record (scalar columns only)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub module: ModuleType,
    pub checklist_id: Uuid,
    pub team_id: Uuid,
    pub service_description: String,
    pub location_description: Option<String>,
    pub status: InspectionStatus,
    pub score_percent: Option<f64>,
    pub created_by_user_id: Uuid,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_offline: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new inspection (always starts in RASCUNHO)
#[derive(Debug, Clone)]
pub struct NewInspection {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub module: ModuleType,
    pub checklist_id: Uuid,
    pub team_id: Uuid,
    pub service_description: String,
    pub location_description: Option<String>,
    pub created_by_user_id: Uuid,
    pub created_offline: bool,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Fully-hydrated inspection aggregate returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionAggregate {
    #[serde(flatten)]
    pub inspection: Inspection,
    pub items: Vec<InspectionItemDetail>,
    /// Evidence attached to the inspection as a whole (not item-scoped)
    pub evidences: Vec<Evidence>,
    pub signature: Option<Signature>,
    pub pending_adjustment: Option<PendingAdjustment>,
    pub collaborators: Vec<Collaborator>,
}

const INSPECTION_COLUMNS: &str = "guid, external_id, module, checklist_id, team_id, \
     service_description, location_description, status, score_percent, created_by_user_id, \
     finalized_at, created_offline, synced_at, created_at, updated_at";

fn map_inspection(row: &sqlx::sqlite::SqliteRow) -> Result<Inspection> {
    let guid: String = row.get("guid");
    let module: String = row.get("module");
    let checklist_id: String = row.get("checklist_id");
    let team_id: String = row.get("team_id");
    let status: String = row.get("status");
    let created_by: String = row.get("created_by_user_id");

    Ok(Inspection {
        id: parse_uuid(&guid)?,
        external_id: row.get("external_id"),
        module: module.parse()?,
        checklist_id: parse_uuid(&checklist_id)?,
        team_id: parse_uuid(&team_id)?,
        service_description: row.get("service_description"),
        location_description: row.get("location_description"),
        status: status.parse()?,
        score_percent: row.get("score_percent"),
        created_by_user_id: parse_uuid(&created_by)?,
        finalized_at: row.get("finalized_at"),
        created_offline: row.get::<i64, _>("created_offline") != 0,
        synced_at: row.get("synced_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Insert a new inspection in RASCUNHO
pub async fn insert(conn: &mut SqliteConnection, new: &NewInspection) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO inspections (
            guid, external_id, module, checklist_id, team_id,
            service_description, location_description, status,
            created_by_user_id, created_offline, synced_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, 'RASCUNHO', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.id.to_string())
    .bind(&new.external_id)
    .bind(new.module.as_str())
    .bind(new.checklist_id.to_string())
    .bind(new.team_id.to_string())
    .bind(&new.service_description)
    .bind(&new.location_description)
    .bind(new.created_by_user_id.to_string())
    .bind(new.created_offline as i64)
    .bind(new.synced_at)
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Load an inspection by server id
pub async fn fetch(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Inspection>> {
    let sql = format!("SELECT {} FROM inspections WHERE guid = ?", INSPECTION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_inspection).transpose()
}

/// Load an inspection by the client-generated external id
pub async fn fetch_by_external_id(
    conn: &mut SqliteConnection,
    external_id: &str,
) -> Result<Option<Inspection>> {
    let sql = format!(
        "SELECT {} FROM inspections WHERE external_id = ?",
        INSPECTION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(external_id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_inspection).transpose()
}

/// Persist the mergeable scalar columns of an inspection.
///
/// Status, score and finalized_at are deliberately excluded; those only move
/// through `mark_finalized` / `set_status`.
pub async fn update_scalars(conn: &mut SqliteConnection, inspection: &Inspection) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE inspections SET
            module = ?,
            checklist_id = ?,
            team_id = ?,
            service_description = ?,
            location_description = ?,
            created_offline = ?,
            synced_at = ?,
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(inspection.module.as_str())
    .bind(inspection.checklist_id.to_string())
    .bind(inspection.team_id.to_string())
    .bind(&inspection.service_description)
    .bind(&inspection.location_description)
    .bind(inspection.created_offline as i64)
    .bind(inspection.synced_at)
    .bind(Utc::now())
    .bind(inspection.id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

/// Write the finalize outcome: terminal-ward status, score, timestamp
pub async fn mark_finalized(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: InspectionStatus,
    score_percent: f64,
    finalized_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE inspections SET status = ?, score_percent = ?, finalized_at = ?, updated_at = ? \
         WHERE guid = ?",
    )
    .bind(status.as_str())
    .bind(score_percent)
    .bind(finalized_at)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

/// Move an inspection to a new status without touching score/finalized_at
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: InspectionStatus,
) -> Result<()> {
    sqlx::query("UPDATE inspections SET status = ?, updated_at = ? WHERE guid = ?")
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

/// Filtered, paginated listing (newest first)
pub async fn list(
    conn: &mut SqliteConnection,
    filters: &InspectionFilters,
    pagination: &PaginationQuery,
) -> Result<(Vec<Inspection>, i64)> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(period_from) = &filters.period_from {
        conditions.push("created_at >= ?");
        binds.push(period_from.clone());
    }
    if let Some(period_to) = &filters.period_to {
        conditions.push("created_at <= ?");
        binds.push(period_to.clone());
    }
    if let Some(module) = filters.module {
        conditions.push("module = ?");
        binds.push(module.as_str().to_string());
    }
    if let Some(team_id) = filters.team_id {
        conditions.push("team_id = ?");
        binds.push(team_id.to_string());
    }
    if let Some(status) = filters.status {
        conditions.push("status = ?");
        binds.push(status.as_str().to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM inspections{}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for bind in &binds {
        count_query = count_query.bind(bind);
    }
    let total = count_query.fetch_one(&mut *conn).await?;

    let limit = pagination.limit.max(1);
    let page = pagination.page.max(1);
    let offset = (page - 1) * limit;

    let list_sql = format!(
        "SELECT {} FROM inspections{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        INSPECTION_COLUMNS, where_clause
    );
    let mut list_query = sqlx::query(&list_sql);
    for bind in &binds {
        list_query = list_query.bind(bind);
    }
    let rows = list_query
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await?;

    let inspections = rows
        .iter()
        .map(map_inspection)
        .collect::<Result<Vec<_>>>()?;

    Ok((inspections, total))
}

/// Paginated listing of one creator's inspections (newest first)
pub async fn list_by_creator(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    pagination: &PaginationQuery,
) -> Result<(Vec<Inspection>, i64)> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM inspections WHERE created_by_user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_one(&mut *conn)
    .await?;

    let limit = pagination.limit.max(1);
    let page = pagination.page.max(1);
    let offset = (page - 1) * limit;

    let sql = format!(
        "SELECT {} FROM inspections WHERE created_by_user_id = ? \
         ORDER BY created_at DESC LIMIT ? OFFSET ?",
        INSPECTION_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await?;

    let inspections = rows
        .iter()
        .map(map_inspection)
        .collect::<Result<Vec<_>>>()?;

    Ok((inspections, total))
}

/// Load the fully-hydrated aggregate: items (with checklist snapshot data and
/// item-scoped evidence), general evidence, signature, pending adjustment and
/// collaborators
pub async fn fetch_aggregate(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<InspectionAggregate>> {
    let Some(inspection) = fetch(&mut *conn, id).await? else {
        return Ok(None);
    };

    let mut items = inspection_items::fetch_details(&mut *conn, id).await?;
    let all_evidences = evidences::fetch_for_inspection(&mut *conn, id).await?;

    // Partition evidence between items and the inspection itself
    let mut general_evidences = Vec::new();
    for evidence in all_evidences {
        match evidence.inspection_item_id {
            Some(item_id) => {
                if let Some(detail) = items.iter_mut().find(|d| d.item.id == item_id) {
                    detail.evidences.push(evidence);
                } else {
                    general_evidences.push(evidence);
                }
            }
            None => general_evidences.push(evidence),
        }
    }

    let signature = signatures::fetch_for_inspection(&mut *conn, id).await?;
    let pending_adjustment = pending_adjustments::fetch_for_inspection(&mut *conn, id).await?;
    let collaborators = collaborators::fetch_for_inspection(&mut *conn, id).await?;

    Ok(Some(InspectionAggregate {
        inspection,
        items,
        evidences: general_evidences,
        signature,
        pending_adjustment,
        collaborators,
    }))
}
