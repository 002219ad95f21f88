//! Request/response types for the inspection API
//!
//! Field names mirror what the mobile/web clients already send (camelCase).

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vistoria_common::{ChecklistAnswer, ModuleType};

/// POST /inspections body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInspectionRequest {
    pub module: ModuleType,
    pub checklist_id: Uuid,
    pub team_id: Uuid,
    pub service_description: String,
    pub location_description: Option<String>,
    pub collaborator_ids: Option<Vec<Uuid>>,
}

/// PUT /inspections/:id body (partial update, never touches status)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInspectionRequest {
    pub module: Option<ModuleType>,
    pub team_id: Option<Uuid>,
    pub service_description: Option<String>,
    pub location_description: Option<String>,
}

/// One entry of the PUT /inspections/:id/items body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAnswerUpdate {
    pub inspection_item_id: Uuid,
    pub answer: Option<ChecklistAnswer>,
    pub notes: Option<String>,
}

/// POST /inspections/:id/signature body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub signer_name: String,
    pub image_base64: String,
}

/// POST /inspections/:id/resolve body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub resolution_notes: String,
    /// Optional base64-encoded remediation photo
    pub resolution_evidence: Option<String>,
}

/// GET /inspections query filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionFilters {
    pub period_from: Option<String>,
    pub period_to: Option<String>,
    pub module: Option<ModuleType>,
    pub team_id: Option<Uuid>,
    pub status: Option<vistoria_common::InspectionStatus>,
}

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

/// Pagination metadata returned alongside list results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Paginated list response
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

// ---------------------------------------------------------------------------
// Offline sync payloads
// ---------------------------------------------------------------------------

/// One checklist answer assembled offline
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItemPayload {
    pub checklist_item_id: Uuid,
    pub answer: Option<ChecklistAnswer>,
    pub notes: Option<String>,
}

/// Evidence reference assembled offline.
///
/// Binary content must already live at the evidence gateway; payloads may only
/// carry the resulting URL/public id. `data_url` is the rejected legacy field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvidencePayload {
    /// App-local item id; may not exist on the server. Prefer checklistItemId.
    pub inspection_item_id: Option<Uuid>,
    /// Checklist item id, used to resolve the server-side inspection item
    pub checklist_item_id: Option<Uuid>,
    pub cloudinary_public_id: Option<String>,
    pub url: Option<String>,
    pub bytes: Option<i64>,
    pub format: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    // Legacy references (kept for dedupe against pre-gateway records)
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    // Legacy inline payload that is no longer accepted
    pub data_url: Option<String>,
}

/// Signature assembled offline
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSignaturePayload {
    pub signer_name: String,
    pub signer_role_label: Option<String>,
    pub cloudinary_public_id: Option<String>,
    pub url: Option<String>,
    pub signed_at: Option<chrono::DateTime<chrono::Utc>>,
    // Legacy inline payloads that are no longer accepted
    pub image_base64: Option<String>,
    pub data_url: Option<String>,
}

/// One inspection assembled offline by the mobile client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInspectionPayload {
    /// Client-generated idempotency key
    pub external_id: Option<String>,
    pub module: ModuleType,
    pub checklist_id: Uuid,
    pub team_id: Uuid,
    pub service_description: String,
    pub location_description: Option<String>,
    pub collaborator_ids: Option<Vec<Uuid>>,
    pub created_offline: Option<bool>,
    pub synced_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub finalize: bool,
    pub items: Option<Vec<SyncItemPayload>>,
    pub evidences: Option<Vec<SyncEvidencePayload>>,
    pub signature: Option<SyncSignaturePayload>,
}

/// POST /sync/inspections body
#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub inspections: Vec<SyncInspectionPayload>,
}

/// Outcome status for one synced inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Created,
    Updated,
    Error,
}

/// Per-payload outcome entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<Uuid>,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /sync/inspections response
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub results: Vec<SyncResult>,
}
