//! Inspection lifecycle service
//!
//! Orchestrates create, per-item answer updates, evidence/signature
//! attachment, finalize and resolve. Role-gated mutability and finalize
//! preconditions are enforced here, not in the handlers.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;
use vistoria_common::{Error, InspectionStatus, Result, UserRole};

use crate::db::inspection_items::InspectionItem;
use crate::db::inspections::{Inspection, InspectionAggregate, NewInspection};
use crate::db::signatures::{NewSignature, Signature, DEFAULT_SIGNER_ROLE_LABEL};
use crate::db::{
    checklists, collaborators, evidences, inspection_items, inspections, pending_adjustments,
    signatures,
};
use crate::services::gateway::EvidenceGateway;
use crate::services::{permissions, scoring};
use crate::types::{
    CreateInspectionRequest, InspectionFilters, ItemAnswerUpdate, PaginatedResponse,
    PaginationMeta, PaginationQuery, ResolveRequest, UpdateInspectionRequest,
};

/// Inspection lifecycle orchestration over the aggregate store
#[derive(Clone)]
pub struct InspectionsService {
    pub(crate) pool: SqlitePool,
    pub(crate) gateway: Arc<dyn EvidenceGateway>,
}

impl InspectionsService {
    pub fn new(pool: SqlitePool, gateway: Arc<dyn EvidenceGateway>) -> Self {
        Self { pool, gateway }
    }

    /// Create a new draft inspection, snapshotting the checklist's active
    /// items into one answer slot each
    pub async fn create(
        &self,
        data: CreateInspectionRequest,
        user_id: Uuid,
    ) -> Result<InspectionAggregate> {
        let new = NewInspection {
            id: Uuid::new_v4(),
            external_id: None,
            module: data.module,
            checklist_id: data.checklist_id,
            team_id: data.team_id,
            service_description: data.service_description,
            location_description: data.location_description,
            created_by_user_id: user_id,
            created_offline: false,
            synced_at: None,
        };

        let mut tx = self.pool.begin().await?;
        Self::create_on(tx.as_mut(), &new, data.collaborator_ids.as_deref()).await?;
        tx.commit().await?;

        info!(inspection_id = %new.id, "inspection created");
        self.find_one(new.id).await
    }

    /// Creation steps shared with the sync reconciler (runs on the caller's
    /// connection/transaction)
    pub(crate) async fn create_on(
        conn: &mut SqliteConnection,
        new: &NewInspection,
        collaborator_ids: Option<&[Uuid]>,
    ) -> Result<()> {
        let checklist = checklists::fetch_checklist(&mut *conn, new.checklist_id)
            .await?
            .ok_or_else(|| Error::NotFound("Checklist não encontrado".to_string()))?;

        if let Some(ids) = collaborator_ids {
            validate_collaborators(&mut *conn, ids).await?;
        }

        inspections::insert(&mut *conn, new).await?;

        // Snapshot the checklist's current active item set; later checklist
        // edits do not retroactively affect this inspection
        let items = checklists::fetch_active_items(&mut *conn, checklist.id).await?;
        for item in &items {
            inspection_items::insert(&mut *conn, new.id, item.id).await?;
        }

        if let Some(ids) = collaborator_ids {
            collaborators::replace_for_inspection(&mut *conn, new.id, &dedupe(ids)).await?;
        }

        Ok(())
    }

    /// Load the fully-hydrated aggregate
    pub async fn find_one(&self, id: Uuid) -> Result<InspectionAggregate> {
        let mut conn = self.pool.acquire().await?;
        inspections::fetch_aggregate(&mut conn, id)
            .await?
            .ok_or_else(|| Error::NotFound("Vistoria não encontrada".to_string()))
    }

    /// Filtered, paginated listing
    pub async fn find_all(
        &self,
        filters: InspectionFilters,
        pagination: PaginationQuery,
    ) -> Result<PaginatedResponse<Inspection>> {
        let mut conn = self.pool.acquire().await?;
        let (data, total) = inspections::list(&mut conn, &filters, &pagination).await?;
        Ok(PaginatedResponse {
            data,
            meta: PaginationMeta::new(pagination.page.max(1), pagination.limit.max(1), total),
        })
    }

    /// Inspections created by one user
    pub async fn find_mine(
        &self,
        user_id: Uuid,
        pagination: PaginationQuery,
    ) -> Result<PaginatedResponse<Inspection>> {
        let mut conn = self.pool.acquire().await?;
        let (data, total) = inspections::list_by_creator(&mut conn, user_id, &pagination).await?;
        Ok(PaginatedResponse {
            data,
            meta: PaginationMeta::new(pagination.page.max(1), pagination.limit.max(1), total),
        })
    }

    /// Partial scalar update, gated by the role-based mutability window.
    /// Never touches status.
    pub async fn update(
        &self,
        id: Uuid,
        patch: UpdateInspectionRequest,
        role: UserRole,
    ) -> Result<InspectionAggregate> {
        let mut conn = self.pool.acquire().await?;
        let mut inspection = fetch_or_not_found(&mut conn, id).await?;

        if !permissions::can_mutate(role, inspection.status) {
            return Err(Error::Permission(
                "Fiscal não pode editar vistoria após finalização".to_string(),
            ));
        }

        if let Some(module) = patch.module {
            inspection.module = module;
        }
        if let Some(team_id) = patch.team_id {
            inspection.team_id = team_id;
        }
        if let Some(service_description) = patch.service_description {
            inspection.service_description = service_description;
        }
        if let Some(location_description) = patch.location_description {
            inspection.location_description = Some(location_description);
        }

        inspections::update_scalars(&mut conn, &inspection).await?;
        drop(conn);

        self.find_one(id).await
    }

    /// Update answer slots in place. Slots absent from the input are left
    /// untouched; the updated slots are returned in input order.
    pub async fn update_items(
        &self,
        id: Uuid,
        updates: Vec<ItemAnswerUpdate>,
    ) -> Result<Vec<InspectionItem>> {
        let mut tx = self.pool.begin().await?;
        let inspection = fetch_or_not_found(tx.as_mut(), id).await?;

        if inspection.status != InspectionStatus::Rascunho {
            return Err(Error::State(
                "Não é possível atualizar itens de vistoria finalizada".to_string(),
            ));
        }

        let mut updated = Vec::with_capacity(updates.len());
        for update in &updates {
            let item = inspection_items::fetch(tx.as_mut(), update.inspection_item_id)
                .await?
                .filter(|item| item.inspection_id == id)
                .ok_or_else(|| Error::NotFound("Item de vistoria não encontrado".to_string()))?;

            inspection_items::update_answer(
                tx.as_mut(),
                item.id,
                update.answer,
                update.notes.as_deref(),
            )
            .await?;

            let refreshed = inspection_items::fetch(tx.as_mut(), item.id)
                .await?
                .ok_or_else(|| Error::Internal("item vanished during update".to_string()))?;
            updated.push(refreshed);
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Upload a photo through the evidence gateway and attach it to the
    /// inspection (or one of its answer slots)
    pub async fn add_evidence(
        &self,
        id: Uuid,
        image: Vec<u8>,
        inspection_item_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<evidences::Evidence> {
        let mut conn = self.pool.acquire().await?;
        let inspection = fetch_or_not_found(&mut conn, id).await?;

        if inspection.status != InspectionStatus::Rascunho {
            return Err(Error::State(
                "Não é possível adicionar evidências em vistoria finalizada".to_string(),
            ));
        }

        if let Some(item_id) = inspection_item_id {
            inspection_items::fetch(&mut conn, item_id)
                .await?
                .filter(|item| item.inspection_id == id)
                .ok_or_else(|| Error::NotFound("Item de vistoria não encontrado".to_string()))?;
        }

        // Upload must complete before the row is written; gateway failures
        // propagate and nothing is persisted
        let folder = format!("vistoria/{}/evidences", id);
        let asset = self.gateway.upload(image, &folder).await?;

        let new = evidences::NewEvidence {
            inspection_id: id,
            inspection_item_id,
            cloudinary_public_id: Some(asset.public_id),
            url: Some(asset.url),
            bytes: Some(asset.bytes),
            format: asset.format,
            width: asset.width,
            height: asset.height,
            file_path: None,
            file_name: None,
            mime_type: None,
            size: None,
            uploaded_by_user_id: user_id.unwrap_or(inspection.created_by_user_id),
        };
        let evidence_id = evidences::insert(&mut conn, &new).await?;

        evidences::fetch(&mut conn, evidence_id)
            .await?
            .ok_or_else(|| Error::Internal("evidence vanished after insert".to_string()))
    }

    /// Upload the sign-off signature image and upsert the inspection's single
    /// signature row
    pub async fn add_signature(
        &self,
        id: Uuid,
        signer_name: String,
        image: Vec<u8>,
    ) -> Result<Signature> {
        let mut conn = self.pool.acquire().await?;
        let inspection = fetch_or_not_found(&mut conn, id).await?;

        if inspection.status != InspectionStatus::Rascunho {
            return Err(Error::State(
                "Não é possível adicionar assinatura em vistoria finalizada".to_string(),
            ));
        }

        let folder = format!("vistoria/{}/signatures", id);
        let asset = self.gateway.upload(image, &folder).await?;

        let new = NewSignature {
            inspection_id: id,
            signer_name,
            signer_role_label: DEFAULT_SIGNER_ROLE_LABEL.to_string(),
            cloudinary_public_id: Some(asset.public_id),
            url: Some(asset.url),
            signed_at: Utc::now(),
        };
        signatures::upsert(&mut conn, &new).await?;

        signatures::fetch_for_inspection(&mut conn, id)
            .await?
            .ok_or_else(|| Error::Internal("signature vanished after upsert".to_string()))
    }

    /// Finalize a draft: requires a signature, requires photo evidence on
    /// non-conforming items whose checklist item demands it, computes the
    /// score and the terminal-ward status, opens/reopens the pending
    /// adjustment when a non-conformity exists
    pub async fn finalize(&self, id: Uuid, user_id: Uuid) -> Result<InspectionAggregate> {
        let mut tx = self.pool.begin().await?;
        Self::finalize_on(tx.as_mut(), id, user_id).await?;
        tx.commit().await?;

        self.find_one(id).await
    }

    /// Finalize steps shared with the sync reconciler
    pub(crate) async fn finalize_on(
        conn: &mut SqliteConnection,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<()> {
        let inspection = fetch_or_not_found(&mut *conn, id).await?;

        if inspection.status != InspectionStatus::Rascunho {
            return Err(Error::State("Vistoria já foi finalizada".to_string()));
        }

        if signatures::fetch_for_inspection(&mut *conn, id).await?.is_none() {
            return Err(Error::Validation(
                "Assinatura do líder/encarregado é obrigatória para finalizar".to_string(),
            ));
        }

        let details = inspection_items::fetch_details(&mut *conn, id).await?;
        for detail in &details {
            let non_conforme =
                detail.item.answer == Some(vistoria_common::ChecklistAnswer::NaoConforme);
            if non_conforme && detail.checklist_item.requires_photo_on_non_conformity {
                let evidence_count = evidences::count_for_item(&mut *conn, detail.item.id).await?;
                if evidence_count == 0 {
                    return Err(Error::Validation(format!(
                        "Item \"{}\" requer foto de evidência quando não conforme",
                        detail.checklist_item.title
                    )));
                }
            }
        }

        let answers: Vec<_> = details.iter().map(|d| d.item.answer).collect();
        let score_percent = scoring::calculate_score_percent(&answers);
        let status = scoring::resolve_final_status(&answers);

        if status == InspectionStatus::PendenteAjuste {
            pending_adjustments::upsert_pending(&mut *conn, id).await?;
        }

        inspections::mark_finalized(&mut *conn, id, status, score_percent, Utc::now()).await?;

        info!(
            inspection_id = %id,
            user_id = %user_id,
            status = %status,
            score_percent,
            "inspection finalized"
        );

        Ok(())
    }

    /// Resolve a pending-adjustment inspection: records the remediation and
    /// moves the inspection to its terminal RESOLVIDA status
    pub async fn resolve(
        &self,
        id: Uuid,
        data: ResolveRequest,
        user_id: Uuid,
    ) -> Result<InspectionAggregate> {
        if data.resolution_notes.trim().is_empty() {
            return Err(Error::Validation("resolutionNotes é obrigatório".to_string()));
        }

        {
            let mut conn = self.pool.acquire().await?;
            let inspection = fetch_or_not_found(&mut conn, id).await?;
            if inspection.status != InspectionStatus::PendenteAjuste {
                return Err(Error::State("Vistoria não está pendente de ajuste".to_string()));
            }
        }

        // Optional remediation photo; must land at the gateway before any row
        // is written
        let resolution_evidence_path = match &data.resolution_evidence {
            Some(encoded) => {
                let image = decode_base64_image(encoded)?;
                let folder = format!("vistoria/{}/resolutions", id);
                let asset = self.gateway.upload(image, &folder).await?;
                Some(asset.url)
            }
            None => None,
        };

        let resolved_at = Utc::now();
        let mut tx = self.pool.begin().await?;
        // Re-check under the transaction; a concurrent resolve loses here
        let inspection = fetch_or_not_found(tx.as_mut(), id).await?;
        if inspection.status != InspectionStatus::PendenteAjuste {
            return Err(Error::State("Vistoria não está pendente de ajuste".to_string()));
        }

        pending_adjustments::mark_resolved(
            tx.as_mut(),
            id,
            user_id,
            &data.resolution_notes,
            resolution_evidence_path.as_deref(),
            resolved_at,
        )
        .await?;
        inspections::set_status(tx.as_mut(), id, InspectionStatus::Resolvida).await?;
        tx.commit().await?;

        info!(inspection_id = %id, user_id = %user_id, "inspection resolved");
        self.find_one(id).await
    }
}

/// Fetch an inspection or fail with the canonical not-found error
pub(crate) async fn fetch_or_not_found(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Inspection> {
    inspections::fetch(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound("Vistoria não encontrada".to_string()))
}

/// Validate that every referenced collaborator exists, listing unknown ids
pub(crate) async fn validate_collaborators(
    conn: &mut SqliteConnection,
    ids: &[Uuid],
) -> Result<()> {
    let unique = dedupe(ids);
    if unique.is_empty() {
        return Ok(());
    }

    let found = collaborators::find_by_ids(conn, &unique).await?;
    if found.len() != unique.len() {
        let found_ids: BTreeSet<Uuid> = found.iter().map(|c| c.id).collect();
        let missing: Vec<String> = unique
            .iter()
            .filter(|id| !found_ids.contains(id))
            .map(|id| id.to_string())
            .collect();
        return Err(Error::Validation(format!(
            "Colaboradores não encontrados: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

fn dedupe(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Decode a base64 image payload (optionally a `data:` URL)
pub(crate) fn decode_base64_image(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => encoded,
    };

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Validation(format!("Imagem base64 inválida: {e}")))
}
