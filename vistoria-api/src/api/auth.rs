//! Caller identity extractor
//!
//! Identity arrives from the upstream API gateway as `x-user-id` and
//! `x-user-role` headers; this service trusts them and only parses. Missing
//! or malformed headers reject with 401 before the handler runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;
use vistoria_common::UserRole;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Authenticated caller, as asserted by the gateway headers
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    /// Reject with 403 unless the caller's role is in `allowed`
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        Err(ApiError::Permission(format!(
            "Perfil {} não tem acesso a esta operação",
            self.role
        )))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)?;
        let role = header_value(parts, USER_ROLE_HEADER)?;

        let user_id = user_id.parse::<Uuid>().map_err(|_| {
            ApiError::Unauthorized(format!("Cabeçalho {} inválido", USER_ID_HEADER))
        })?;
        let role = role.parse::<UserRole>().map_err(|_| {
            ApiError::Unauthorized(format!("Cabeçalho {} inválido", USER_ROLE_HEADER))
        })?;

        Ok(AuthUser { user_id, role })
    }
}

fn header_value(parts: &Parts, name: &str) -> Result<String, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_string())
        .ok_or_else(|| ApiError::Unauthorized(format!("Cabeçalho {} ausente", name)))
}
