//! Inspection lifecycle API handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;
use vistoria_common::UserRole;

use crate::api::auth::AuthUser;
use crate::db::evidences::Evidence;
use crate::db::inspection_items::InspectionItem;
use crate::db::inspections::{Inspection, InspectionAggregate};
use crate::db::signatures::Signature;
use crate::error::{ApiError, ApiResult};
use crate::services::inspections::decode_base64_image;
use crate::types::{
    CreateInspectionRequest, InspectionFilters, ItemAnswerUpdate, PaginatedResponse,
    PaginationQuery, ResolveRequest, SignatureRequest, UpdateInspectionRequest,
};
use crate::AppState;

/// POST /inspections
pub async fn create_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateInspectionRequest>,
) -> ApiResult<Json<InspectionAggregate>> {
    user.require_role(&[UserRole::Fiscal, UserRole::Gestor])?;
    let aggregate = state.inspections.create(request, user.user_id).await?;
    Ok(Json(aggregate))
}

/// GET /inspections
pub async fn list_inspections(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filters): Query<InspectionFilters>,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<PaginatedResponse<Inspection>>> {
    user.require_role(&[UserRole::Admin, UserRole::Gestor])?;
    let page = state.inspections.find_all(filters, pagination).await?;
    Ok(Json(page))
}

/// GET /inspections/mine
pub async fn list_my_inspections(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<PaginatedResponse<Inspection>>> {
    user.require_role(&[UserRole::Fiscal])?;
    let page = state.inspections.find_mine(user.user_id, pagination).await?;
    Ok(Json(page))
}

/// GET /inspections/:id
pub async fn get_inspection(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InspectionAggregate>> {
    let aggregate = state.inspections.find_one(id).await?;
    Ok(Json(aggregate))
}

/// PUT /inspections/:id
pub async fn update_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateInspectionRequest>,
) -> ApiResult<Json<InspectionAggregate>> {
    let aggregate = state.inspections.update(id, request, user.role).await?;
    Ok(Json(aggregate))
}

/// PUT /inspections/:id/items
pub async fn update_inspection_items(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(updates): Json<Vec<ItemAnswerUpdate>>,
) -> ApiResult<Json<Vec<InspectionItem>>> {
    let items = state.inspections.update_items(id, updates).await?;
    Ok(Json(items))
}

/// POST /inspections/:id/evidences (multipart: `file`, optional
/// `inspectionItemId`)
pub async fn add_evidence(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<Evidence>> {
    let mut image: Option<Vec<u8>> = None;
    let mut inspection_item_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Multipart inválido: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Arquivo inválido: {e}")))?;
                image = Some(bytes.to_vec());
            }
            Some("inspectionItemId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Campo inválido: {e}")))?;
                let parsed = text.trim().parse::<Uuid>().map_err(|_| {
                    ApiError::Validation("inspectionItemId inválido".to_string())
                })?;
                inspection_item_id = Some(parsed);
            }
            _ => {}
        }
    }

    let image = image
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::Validation("Campo \"file\" é obrigatório".to_string()))?;

    let evidence = state
        .inspections
        .add_evidence(id, image, inspection_item_id, Some(user.user_id))
        .await?;
    Ok(Json(evidence))
}

/// POST /inspections/:id/signature
pub async fn add_signature(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SignatureRequest>,
) -> ApiResult<Json<Signature>> {
    if request.signer_name.trim().is_empty() {
        return Err(ApiError::Validation("signerName é obrigatório".to_string()));
    }
    let image = decode_base64_image(&request.image_base64)?;

    let signature = state
        .inspections
        .add_signature(id, request.signer_name, image)
        .await?;
    Ok(Json(signature))
}

/// POST /inspections/:id/finalize
pub async fn finalize_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InspectionAggregate>> {
    user.require_role(&[UserRole::Fiscal, UserRole::Gestor])?;
    let aggregate = state.inspections.finalize(id, user.user_id).await?;
    Ok(Json(aggregate))
}

/// POST /inspections/:id/resolve
pub async fn resolve_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<Json<InspectionAggregate>> {
    user.require_role(&[UserRole::Gestor, UserRole::Admin])?;
    let aggregate = state.inspections.resolve(id, request, user.user_id).await?;
    Ok(Json(aggregate))
}

/// Build inspection lifecycle routes
pub fn inspection_routes() -> Router<AppState> {
    Router::new()
        .route("/inspections", post(create_inspection).get(list_inspections))
        .route("/inspections/mine", get(list_my_inspections))
        .route(
            "/inspections/:id",
            get(get_inspection).put(update_inspection),
        )
        .route("/inspections/:id/items", put(update_inspection_items))
        .route("/inspections/:id/evidences", post(add_evidence))
        .route("/inspections/:id/signature", post(add_signature))
        .route("/inspections/:id/finalize", post(finalize_inspection))
        .route("/inspections/:id/resolve", post(resolve_inspection))
}
