use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::warn;

use crate::{
    entity::{user, user::Role},
    error::AppError,
    repositories,
    utils::jwt::UserClaims,
    ServiceState,
};

/// The authenticated principal behind a bearer access token. The user row is
/// reloaded on every request so role changes and deletions apply at once.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.0.is_admin() {
            Ok(())
        } else {
            warn!("Admin route refused for {}", self.0.username);
            Err(AppError::admin_required())
        }
    }

    pub fn require_supervisor(&self) -> Result<(), AppError> {
        if self.0.role == Role::Supervisor {
            Ok(())
        } else {
            Err(AppError::Forbidden("Supervisors only".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl FromRequestParts<Arc<ServiceState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServiceState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized("Not authenticated".to_string()))?;

        let claims = UserClaims::decode(bearer.token(), &state.config.jwt.access_token_secret)
            .map_err(|e| {
                warn!("Rejected access token: {}", e);
                AppError::credentials()
            })?
            .claims;

        let user = repositories::user::find_by_id(state.db.as_ref(), claims.uid)
            .await?
            .filter(|u| u.username == claims.sub)
            .ok_or_else(AppError::credentials)?;

        Ok(CurrentUser(user))
    }
}
