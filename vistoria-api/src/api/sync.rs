//! Offline sync API handler

use axum::{extract::State, routing::post, Json, Router};

use crate::api::auth::AuthUser;
use crate::error::ApiResult;
use crate::types::{SyncRequest, SyncResponse};
use crate::AppState;

/// POST /sync/inspections
///
/// Always responds 200; per-payload failures are reported as ERROR entries
/// in the result list.
pub async fn sync_inspections(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SyncRequest>,
) -> ApiResult<Json<SyncResponse>> {
    let response = state
        .inspections
        .sync_inspections(request, user.user_id, user.role)
        .await;
    Ok(Json(response))
}

/// Build sync routes
pub fn sync_routes() -> Router<AppState> {
    Router::new().route("/sync/inspections", post(sync_inspections))
}
