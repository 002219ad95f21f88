//! Inspection lifecycle integration tests
//!
//! Exercise the full draft -> finalize -> resolve flow over the HTTP router,
//! including role gates, finalize preconditions and score computation.

mod helpers;

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;
use vistoria_api::build_router;

use helpers::{send, test_state};

fn base64_png() -> String {
    // Payload content is irrelevant to the mock gateway
    "data:image/png;base64,aGVsbG8gdmlzdG9yaWE=".to_string()
}

async fn create_draft(app: &axum::Router, seed: &helpers::Seed) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/inspections",
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!({
            "module": "SEGURANCA_TRABALHO",
            "checklistId": seed.checklist_id,
            "teamId": seed.team_id,
            "serviceDescription": "Montagem de andaimes",
            "locationDescription": "Bloco B",
            "collaboratorIds": [seed.collaborator_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body
}

#[tokio::test]
async fn create_snapshots_active_checklist_items() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    let body = create_draft(&app, &seed).await;

    assert_eq!(body["status"], "RASCUNHO");
    assert_eq!(body["items"].as_array().unwrap().len(), 4);
    assert_eq!(body["collaborators"].as_array().unwrap().len(), 1);
    assert!(body["scorePercent"].is_null());
    // Items come back in checklist sort order with unanswered slots
    assert_eq!(body["items"][0]["checklistItem"]["title"], "Uso de EPI");
    assert!(body["items"][0]["answer"].is_null());
}

#[tokio::test]
async fn finalize_requires_signature() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    let draft = create_draft(&app, &seed).await;
    let id = draft["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/finalize"),
        Some((seed.fiscal_id, "FISCAL")),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Assinatura"));
}

#[tokio::test]
async fn non_conformity_without_photo_blocks_finalize() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state.clone());

    let draft = create_draft(&app, &seed).await;
    let id = draft["id"].as_str().unwrap().to_string();
    let items = draft["items"].as_array().unwrap();
    // Second item ("Sinalização da área") requires a photo when NAO_CONFORME
    let photo_item = items[1]["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/inspections/{id}/items"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!([
            {"inspectionItemId": photo_item, "answer": "NAO_CONFORME", "notes": "Faixa ausente"},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/signature"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!({"signerName": "Carlos Líder", "imageBase64": base64_png()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/finalize"),
        Some((seed.fiscal_id, "FISCAL")),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Sinalização da área"));
}

#[tokio::test]
async fn full_lifecycle_with_non_conformity_and_resolution() {
    let (state, gateway, seed) = test_state().await;
    let app = build_router(state.clone());

    let draft = create_draft(&app, &seed).await;
    let id: Uuid = draft["id"].as_str().unwrap().parse().unwrap();
    let items = draft["items"].as_array().unwrap();
    let item_id = |i: usize| items[i]["id"].as_str().unwrap().to_string();

    // CONFORME, NAO_CONFORME, NAO_APLICAVEL, one left unanswered:
    // evaluated set is {CONFORME, NAO_CONFORME} -> 50% and a pending
    // adjustment
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/inspections/{id}/items"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!([
            {"inspectionItemId": item_id(0), "answer": "CONFORME"},
            {"inspectionItemId": item_id(1), "answer": "NAO_CONFORME", "notes": "Sem sinalização"},
            {"inspectionItemId": item_id(2), "answer": "NAO_APLICAVEL"},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Photo required by the non-conforming item
    let photo_item: Uuid = item_id(1).parse().unwrap();
    state
        .inspections
        .add_evidence(id, vec![0xFF, 0xD8, 0xFF], Some(photo_item), Some(seed.fiscal_id))
        .await
        .unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/signature"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!({"signerName": "Carlos Líder", "imageBase64": base64_png()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/finalize"),
        Some((seed.fiscal_id, "FISCAL")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "finalize failed: {body}");
    assert_eq!(body["status"], "PENDENTE_AJUSTE");
    assert_eq!(body["scorePercent"], 50.0);
    assert_eq!(body["pendingAdjustment"]["status"], "PENDENTE");
    assert!(body["finalizedAt"].is_string());

    // Finalizing twice is an invalid state transition
    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/finalize"),
        Some((seed.fiscal_id, "FISCAL")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    // Fiscal is locked out of edits once the draft window closes
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/inspections/{id}"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!({"serviceDescription": "tentativa"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Manager resolves the pending adjustment
    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/resolve"),
        Some((seed.gestor_id, "GESTOR")),
        Some(json!({
            "resolutionNotes": "Sinalização instalada",
            "resolutionEvidence": base64_png(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "resolve failed: {body}");
    assert_eq!(body["status"], "RESOLVIDA");
    assert_eq!(body["pendingAdjustment"]["status"], "RESOLVIDA");
    assert_eq!(
        body["pendingAdjustment"]["resolutionNotes"],
        "Sinalização instalada"
    );

    // RESOLVIDA is terminal
    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/resolve"),
        Some((seed.gestor_id, "GESTOR")),
        Some(json!({"resolutionNotes": "de novo"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    // Item photo, signature and resolution photo all went through the gateway
    assert_eq!(gateway.upload_count(), 3);
}

#[tokio::test]
async fn all_conforme_finalizes_clean() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    let draft = create_draft(&app, &seed).await;
    let id = draft["id"].as_str().unwrap().to_string();
    let updates: Vec<Value> = draft["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| json!({"inspectionItemId": item["id"], "answer": "CONFORME"}))
        .collect();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/inspections/{id}/items"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(Value::Array(updates)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/signature"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!({"signerName": "Carlos Líder", "imageBase64": base64_png()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/finalize"),
        Some((seed.fiscal_id, "FISCAL")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FINALIZADA");
    assert_eq!(body["scorePercent"], 100.0);
    assert!(body["pendingAdjustment"].is_null());
}

#[tokio::test]
async fn clean_finalized_inspection_cannot_be_resolved() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    let draft = create_draft(&app, &seed).await;
    let id = draft["id"].as_str().unwrap().to_string();
    let updates: Vec<Value> = draft["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| json!({"inspectionItemId": item["id"], "answer": "CONFORME"}))
        .collect();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/inspections/{id}/items"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(Value::Array(updates)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/signature"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!({"signerName": "Carlos Líder", "imageBase64": base64_png()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/finalize"),
        Some((seed.fiscal_id, "FISCAL")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FINALIZADA");

    // FINALIZADA has no pending adjustment; resolve is not a valid transition
    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/resolve"),
        Some((seed.gestor_id, "GESTOR")),
        Some(json!({"resolutionNotes": "nada a resolver"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
    assert_eq!(
        body["error"]["message"],
        "Vistoria não está pendente de ajuste"
    );
}

#[tokio::test]
async fn item_batch_with_unknown_slot_applies_nothing() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    let draft = create_draft(&app, &seed).await;
    let id = draft["id"].as_str().unwrap().to_string();
    let first_item = draft["items"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/inspections/{id}/items"),
        Some((seed.fiscal_id, "FISCAL")),
        Some(json!([
            {"inspectionItemId": first_item, "answer": "CONFORME"},
            {"inspectionItemId": Uuid::new_v4(), "answer": "NAO_CONFORME"},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    // The valid tuple rolled back with the failed batch
    let (status, aggregate) = send(
        &app,
        "GET",
        &format!("/inspections/{id}"),
        Some((seed.gestor_id, "GESTOR")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(aggregate["items"][0]["answer"].is_null());
}

#[tokio::test]
async fn resolve_requires_notes_and_pending_status() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    let draft = create_draft(&app, &seed).await;
    let id = draft["id"].as_str().unwrap().to_string();

    // Empty notes rejected before any state check
    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/resolve"),
        Some((seed.gestor_id, "GESTOR")),
        Some(json!({"resolutionNotes": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // A draft has no pending adjustment to resolve
    let (status, body) = send(
        &app,
        "POST",
        &format!("/inspections/{id}/resolve"),
        Some((seed.gestor_id, "GESTOR")),
        Some(json!({"resolutionNotes": "ok"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn identity_headers_and_role_gates() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    // No identity headers at all
    let (status, body) = send(&app, "GET", "/inspections", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

    // Malformed role token
    let (status, _) = send(
        &app,
        "GET",
        "/inspections",
        Some((seed.admin_id, "SUPERVISOR")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Fiscal may not use the management listing
    let (status, body) = send(
        &app,
        "GET",
        "/inspections",
        Some((seed.fiscal_id, "FISCAL")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Admin may not create inspections
    let (status, _) = send(
        &app,
        "POST",
        "/inspections",
        Some((seed.admin_id, "ADMIN")),
        Some(json!({
            "module": "QUALIDADE",
            "checklistId": seed.checklist_id,
            "teamId": seed.team_id,
            "serviceDescription": "x",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_and_mine_pagination() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    for _ in 0..3 {
        create_draft(&app, &seed).await;
    }

    let (status, body) = send(
        &app,
        "GET",
        "/inspections?page=1&limit=2",
        Some((seed.gestor_id, "GESTOR")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["totalPages"], 2);
    assert_eq!(body["meta"]["hasNext"], true);

    // Status filter narrows to nothing
    let (status, body) = send(
        &app,
        "GET",
        "/inspections?status=FINALIZADA",
        Some((seed.gestor_id, "GESTOR")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 0);

    // The fiscal sees their own drafts
    let (status, body) = send(
        &app,
        "GET",
        "/inspections/mine",
        Some((seed.fiscal_id, "FISCAL")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 3);
}

#[tokio::test]
async fn unknown_inspection_is_404_with_portuguese_message() {
    let (state, _gateway, seed) = test_state().await;
    let app = build_router(state);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/inspections/{}", Uuid::new_v4()),
        Some((seed.gestor_id, "GESTOR")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "Vistoria não encontrada");
}
