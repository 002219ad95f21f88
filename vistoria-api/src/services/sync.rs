//! Offline sync reconciler
//!
//! Merges batches of client-constructed inspections into server state, keyed
//! by the client-generated external id. Each payload runs inside its own
//! transaction: a failure rolls back that one inspection's writes and is
//! reported as an ERROR result without aborting sibling payloads. Replaying
//! an identical batch yields CREATED then UPDATED with no duplicate rows.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;
use vistoria_common::{Error, Result, UserRole};

use crate::db::evidences::{self, EvidenceMatchKeys, NewEvidence};
use crate::db::inspections::{self, Inspection, NewInspection};
use crate::db::signatures::{self, NewSignature, DEFAULT_SIGNER_ROLE_LABEL};
use crate::db::{collaborators, inspection_items};
use crate::services::inspections::{fetch_or_not_found, validate_collaborators, InspectionsService};
use crate::services::permissions;
use crate::types::{
    SyncEvidencePayload, SyncInspectionPayload, SyncRequest, SyncResponse, SyncResult, SyncStatus,
};

impl InspectionsService {
    /// Process a batch of offline inspections. Payloads are handled
    /// sequentially and independently; per-payload errors become ERROR
    /// entries in the result list.
    pub async fn sync_inspections(
        &self,
        request: SyncRequest,
        user_id: Uuid,
        role: UserRole,
    ) -> SyncResponse {
        let mut results = Vec::with_capacity(request.inspections.len());

        for payload in request.inspections {
            let external_id = payload.external_id.clone();
            match self.sync_single_inspection(payload, user_id, role).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(
                        external_id = external_id.as_deref().unwrap_or("<missing>"),
                        error = %err,
                        "sync payload rejected"
                    );
                    results.push(SyncResult {
                        external_id,
                        server_id: None,
                        status: SyncStatus::Error,
                        message: Some(error_message(&err)),
                    });
                }
            }
        }

        SyncResponse { results }
    }

    /// Idempotently merge one offline inspection into server state
    pub async fn sync_single_inspection(
        &self,
        payload: SyncInspectionPayload,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<SyncResult> {
        let external_id = payload
            .external_id
            .clone()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                Error::Validation("externalId é obrigatório para sincronização".to_string())
            })?;

        // Inline binaries are rejected before any write happens
        reject_embedded_images(&payload)?;

        let mut tx = self.pool.begin().await?;

        let existing = inspections::fetch_by_external_id(tx.as_mut(), &external_id).await?;
        let mut created = false;

        let inspection = match existing {
            Some(inspection) => inspection,
            None => {
                let new = NewInspection {
                    id: Uuid::new_v4(),
                    external_id: Some(external_id.clone()),
                    module: payload.module,
                    checklist_id: payload.checklist_id,
                    team_id: payload.team_id,
                    service_description: payload.service_description.clone(),
                    location_description: payload.location_description.clone(),
                    created_by_user_id: user_id,
                    created_offline: payload.created_offline.unwrap_or(true),
                    synced_at: Some(payload.synced_at.unwrap_or_else(Utc::now)),
                };

                match Self::create_on(tx.as_mut(), &new, payload.collaborator_ids.as_deref()).await
                {
                    Ok(()) => {
                        created = true;
                        fetch_or_not_found(tx.as_mut(), new.id).await?
                    }
                    // A concurrent sync of the same offline record won the
                    // insert; the unique index on external_id surfaces that,
                    // and this writer falls back to the update path
                    Err(err) if is_unique_violation(&err) => inspections::fetch_by_external_id(
                        tx.as_mut(),
                        &external_id,
                    )
                    .await?
                    .ok_or_else(|| {
                        Error::Internal("external id conflict without matching row".to_string())
                    })?,
                    Err(err) => return Err(err),
                }
            }
        };

        if !created {
            merge_existing(tx.as_mut(), &inspection, &payload, role).await?;
        }

        merge_items(tx.as_mut(), inspection.id, &payload).await?;
        merge_evidences(tx.as_mut(), inspection.id, &payload, user_id).await?;
        merge_signature(tx.as_mut(), inspection.id, &payload).await?;

        if payload.finalize {
            Self::finalize_on(tx.as_mut(), inspection.id, user_id).await?;
        }

        tx.commit().await?;

        let status = if created { SyncStatus::Created } else { SyncStatus::Updated };
        info!(
            external_id = %external_id,
            inspection_id = %inspection.id,
            status = ?status,
            "inspection synced"
        );

        Ok(SyncResult {
            external_id: Some(external_id),
            server_id: Some(inspection.id),
            status,
            message: None,
        })
    }
}

/// Role gate and scalar merge for an inspection that already exists
async fn merge_existing(
    conn: &mut SqliteConnection,
    inspection: &Inspection,
    payload: &SyncInspectionPayload,
    role: UserRole,
) -> Result<()> {
    if !permissions::can_mutate(role, inspection.status) {
        return Err(Error::Permission(
            "Fiscal não pode editar vistoria após finalização".to_string(),
        ));
    }

    let mut merged = inspection.clone();
    merged.module = payload.module;
    merged.checklist_id = payload.checklist_id;
    merged.team_id = payload.team_id;
    merged.service_description = payload.service_description.clone();
    if payload.location_description.is_some() {
        merged.location_description = payload.location_description.clone();
    }
    if let Some(created_offline) = payload.created_offline {
        merged.created_offline = created_offline;
    }
    merged.synced_at = Some(payload.synced_at.unwrap_or_else(Utc::now));

    inspections::update_scalars(&mut *conn, &merged).await?;

    if let Some(ids) = &payload.collaborator_ids {
        validate_collaborators(&mut *conn, ids).await?;
        collaborators::replace_for_inspection(&mut *conn, merged.id, &unique_ids(ids)).await?;
    }

    Ok(())
}

/// Merge answers by (inspection, checklist item): update the existing slot,
/// or create one for checklist items that appeared after the snapshot
async fn merge_items(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    payload: &SyncInspectionPayload,
) -> Result<()> {
    let Some(items) = &payload.items else {
        return Ok(());
    };

    for item in items {
        let slot_id = match inspection_items::fetch_by_checklist_item(
            &mut *conn,
            inspection_id,
            item.checklist_item_id,
        )
        .await?
        {
            Some(slot) => slot.id,
            None => {
                inspection_items::insert(&mut *conn, inspection_id, item.checklist_item_id).await?
            }
        };

        inspection_items::update_answer(&mut *conn, slot_id, item.answer, item.notes.as_deref())
            .await?;
    }

    Ok(())
}

/// Insert evidence references that no existing row matches. The matcher
/// strategies run in priority order: gateway public id, URL, legacy composite
/// key.
async fn merge_evidences(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    payload: &SyncInspectionPayload,
    user_id: Uuid,
) -> Result<()> {
    let Some(evidences_in) = &payload.evidences else {
        return Ok(());
    };

    for evidence in evidences_in {
        let item_id = resolve_item_reference(&mut *conn, inspection_id, evidence).await?;

        let keys = EvidenceMatchKeys {
            cloudinary_public_id: evidence.cloudinary_public_id.clone(),
            url: evidence.url.clone(),
            file_path: evidence.file_path.clone(),
            file_name: evidence.file_name.clone(),
            size: evidence.size,
        };

        if evidences::find_matching(&mut *conn, inspection_id, item_id, &keys)
            .await?
            .is_some()
        {
            continue;
        }

        let new = NewEvidence {
            inspection_id,
            inspection_item_id: item_id,
            cloudinary_public_id: evidence.cloudinary_public_id.clone(),
            url: evidence.url.clone(),
            bytes: evidence.bytes,
            format: evidence.format.clone(),
            width: evidence.width,
            height: evidence.height,
            file_path: evidence.file_path.clone(),
            file_name: evidence.file_name.clone(),
            mime_type: evidence.mime_type.clone(),
            size: evidence.size,
            uploaded_by_user_id: user_id,
        };
        evidences::insert(&mut *conn, &new).await?;
    }

    Ok(())
}

/// Resolve the answer slot an evidence reference points at. The checklist
/// item id is preferred; app-local inspection item ids are only honored when
/// they exist on this inspection.
async fn resolve_item_reference(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    evidence: &SyncEvidencePayload,
) -> Result<Option<Uuid>> {
    if let Some(checklist_item_id) = evidence.checklist_item_id {
        let slot_id = match inspection_items::fetch_by_checklist_item(
            &mut *conn,
            inspection_id,
            checklist_item_id,
        )
        .await?
        {
            Some(slot) => slot.id,
            None => inspection_items::insert(&mut *conn, inspection_id, checklist_item_id).await?,
        };
        return Ok(Some(slot_id));
    }

    if let Some(item_id) = evidence.inspection_item_id {
        let slot = inspection_items::fetch(&mut *conn, item_id)
            .await?
            .filter(|slot| slot.inspection_id == inspection_id);
        return Ok(slot.map(|s| s.id));
    }

    Ok(None)
}

/// Upsert the signature; existing URL/public id survive when the payload
/// omits them
async fn merge_signature(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
    payload: &SyncInspectionPayload,
) -> Result<()> {
    let Some(signature) = &payload.signature else {
        return Ok(());
    };

    let new = NewSignature {
        inspection_id,
        signer_name: signature.signer_name.clone(),
        signer_role_label: signature
            .signer_role_label
            .clone()
            .unwrap_or_else(|| DEFAULT_SIGNER_ROLE_LABEL.to_string()),
        cloudinary_public_id: signature.cloudinary_public_id.clone(),
        url: signature.url.clone(),
        signed_at: signature.signed_at.unwrap_or_else(Utc::now),
    };
    signatures::upsert(&mut *conn, &new).await?;

    Ok(())
}

/// Legacy inline-image payloads must have been uploaded to the evidence
/// gateway before sync; only URL/public-id references are accepted
fn reject_embedded_images(payload: &SyncInspectionPayload) -> Result<()> {
    let evidence_inline = payload
        .evidences
        .iter()
        .flatten()
        .any(|e| has_content(e.data_url.as_deref()));

    let signature_inline = payload.signature.as_ref().is_some_and(|s| {
        has_content(s.data_url.as_deref()) || has_content(s.image_base64.as_deref())
    });

    if evidence_inline || signature_inline {
        return Err(Error::Validation(
            "Imagens embutidas (base64/dataUrl) não são aceitas no sync; \
             envie a imagem pelo gateway de evidências e informe url/publicId"
                .to_string(),
        ));
    }

    Ok(())
}

fn has_content(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}

fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Result messages carry the domain message without the variant prefix
fn error_message(err: &Error) -> String {
    match err {
        Error::NotFound(m)
        | Error::Validation(m)
        | Error::Permission(m)
        | Error::State(m)
        | Error::Upstream(m)
        | Error::Internal(m) => m.clone(),
        other => other.to_string(),
    }
}

fn is_unique_violation(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db)) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}
