use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::TransactionTrait;
use tracing::info;

use crate::{
    dto::{
        request::{RuleRequest, RulesQuery},
        response::RuleResponse,
    },
    error::{AppError, AppResult},
    repositories,
    services::{action_center, inspection::clean},
    utils::current_user::CurrentUser,
    ServiceState,
};

fn rule_not_found() -> AppError {
    AppError::NotFound("Rule not found".to_string())
}

pub async fn list(
    State(state): State<Arc<ServiceState>>,
    _current: CurrentUser,
    Query(query): Query<RulesQuery>,
) -> AppResult<Json<Vec<RuleResponse>>> {
    let field = clean(query.field);
    let rules =
        repositories::rule::find_with_action(state.db.as_ref(), query.rule_id, field.as_deref())
            .await?;
    Ok(Json(
        rules
            .into_iter()
            .map(|(rule, action)| RuleResponse::new(rule, action))
            .collect(),
    ))
}

pub async fn create(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Json(req): Json<RuleRequest>,
) -> AppResult<Json<RuleResponse>> {
    current.require_admin()?;

    let tx = state.db.begin().await?;
    let draft = action_center::validate_rule(&tx, req).await?;
    let created = repositories::rule::save(&tx, draft).await?;
    let action = repositories::action::find_by_id(&tx, created.action_id).await?;
    tx.commit().await?;

    info!("Rule {} ({} = {}) created", created.id, created.field, created.option_value);
    Ok(Json(RuleResponse::new(created, action)))
}

pub async fn update(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<RuleRequest>,
) -> AppResult<Json<RuleResponse>> {
    current.require_admin()?;

    let tx = state.db.begin().await?;
    let existing = repositories::rule::find_by_id(&tx, id)
        .await?
        .ok_or_else(rule_not_found)?;
    let draft = action_center::validate_rule(&tx, req).await?;
    let updated = repositories::rule::replace(&tx, existing, draft).await?;
    let dropped = action_center::prune_for_rule(&tx, &updated).await?;
    let action = repositories::action::find_by_id(&tx, updated.action_id).await?;
    tx.commit().await?;

    info!("Rule {} updated ({} stale match state(s) dropped)", id, dropped);
    Ok(Json(RuleResponse::new(updated, action)))
}

pub async fn delete(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    current.require_admin()?;

    let tx = state.db.begin().await?;
    if repositories::rule::find_by_id(&tx, id).await?.is_none() {
        return Err(rule_not_found());
    }
    repositories::rule::delete(&tx, id).await?;
    tx.commit().await?;

    info!("Rule {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}
