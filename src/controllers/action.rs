use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::TransactionTrait;
use tracing::info;

use crate::{
    dto::{request::ActionRequest, response::ActionResponse},
    error::{AppError, AppResult},
    repositories::action,
    utils::current_user::CurrentUser,
    ServiceState,
};

pub async fn list(
    State(state): State<Arc<ServiceState>>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<ActionResponse>>> {
    let actions = action::find_all(state.db.as_ref()).await?;
    Ok(Json(actions.into_iter().map(ActionResponse::from).collect()))
}

pub async fn create(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Json(req): Json<ActionRequest>,
) -> AppResult<Json<ActionResponse>> {
    current.require_admin()?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::invalid_field("name", "Action name must not be blank"));
    }

    let tx = state.db.begin().await?;
    if action::find_by_name(&tx, name).await?.is_some() {
        return Err(AppError::BadRequest("Action already exists".to_string()));
    }
    let created = action::save(&tx, name).await?;
    tx.commit().await?;

    info!("Action '{}' created", created.name);
    Ok(Json(created.into()))
}

pub async fn delete(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    current.require_admin()?;

    let tx = state.db.begin().await?;
    if action::find_by_id(&tx, id).await?.is_none() {
        return Err(AppError::NotFound("Action not found".to_string()));
    }
    action::delete(&tx, id).await?;
    tx.commit().await?;

    info!("Action {} deleted with its rules", id);
    Ok(StatusCode::NO_CONTENT)
}
