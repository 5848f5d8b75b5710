use std::collections::HashMap;

use crate::entity::{action_match, action_match::MatchStatus};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

#[tracing::instrument(skip_all)]
pub async fn find<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
    rule_id: i32,
) -> Result<Option<action_match::Model>, DbErr> {
    action_match::Entity::find()
        .filter(action_match::Column::InspectionId.eq(inspection_id))
        .filter(action_match::Column::RuleId.eq(rule_id))
        .one(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn find_all_keyed<C: ConnectionTrait>(
    db: &C,
) -> Result<HashMap<(i32, i32), action_match::Model>, DbErr> {
    Ok(action_match::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|m| ((m.inspection_id, m.rule_id), m))
        .collect())
}

#[tracing::instrument(skip_all)]
pub async fn find_by_inspection<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
) -> Result<Vec<action_match::Model>, DbErr> {
    action_match::Entity::find()
        .filter(action_match::Column::InspectionId.eq(inspection_id))
        .all(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_rule<C: ConnectionTrait>(
    db: &C,
    rule_id: i32,
) -> Result<Vec<action_match::Model>, DbErr> {
    action_match::Entity::find()
        .filter(action_match::Column::RuleId.eq(rule_id))
        .all(db)
        .await
}

/// Inserts a pending row for the pair unless one already exists.
async fn ensure_row<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
    rule_id: i32,
) -> Result<(), DbErr> {
    let row = action_match::ActiveModel {
        inspection_id: Set(inspection_id),
        rule_id: Set(rule_id),
        status: Set(MatchStatus::Pending),
        assignee_user_id: Set(None),
        assignee2_user_id: Set(None),
        confirmed_by: Set(None),
        confirmed_at: Set(None),
        notes: Set(None),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    action_match::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                action_match::Column::InspectionId,
                action_match::Column::RuleId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

fn pair_missing(inspection_id: i32, rule_id: i32) -> DbErr {
    DbErr::RecordNotFound(format!(
        "action match ({inspection_id}, {rule_id}) vanished"
    ))
}

/// Moves the pair from pending to done. `None` when it was already done.
#[tracing::instrument(skip_all)]
pub async fn set_done<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
    rule_id: i32,
    confirmed_by: &str,
    confirmed_at: DateTime<Utc>,
    notes: Option<String>,
) -> Result<Option<action_match::Model>, DbErr> {
    ensure_row(db, inspection_id, rule_id).await?;
    let moved = action_match::Entity::update_many()
        .col_expr(action_match::Column::Status, Expr::value(MatchStatus::Done))
        .col_expr(
            action_match::Column::ConfirmedBy,
            Expr::value(Some(confirmed_by.to_string())),
        )
        .col_expr(action_match::Column::ConfirmedAt, Expr::value(Some(confirmed_at)))
        .col_expr(action_match::Column::Notes, Expr::value(notes))
        .col_expr(action_match::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(action_match::Column::InspectionId.eq(inspection_id))
        .filter(action_match::Column::RuleId.eq(rule_id))
        .filter(action_match::Column::Status.eq(MatchStatus::Pending))
        .exec(db)
        .await?
        .rows_affected;
    if moved == 0 {
        return Ok(None);
    }
    find(db, inspection_id, rule_id).await
}

/// Moves the pair from done back to pending. `None` when it was not done.
#[tracing::instrument(skip_all)]
pub async fn set_pending<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
    rule_id: i32,
) -> Result<Option<action_match::Model>, DbErr> {
    let moved = action_match::Entity::update_many()
        .col_expr(action_match::Column::Status, Expr::value(MatchStatus::Pending))
        .col_expr(action_match::Column::ConfirmedBy, Expr::value(None::<String>))
        .col_expr(
            action_match::Column::ConfirmedAt,
            Expr::value(None::<DateTime<Utc>>),
        )
        .col_expr(action_match::Column::Notes, Expr::value(None::<String>))
        .col_expr(action_match::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(action_match::Column::InspectionId.eq(inspection_id))
        .filter(action_match::Column::RuleId.eq(rule_id))
        .filter(action_match::Column::Status.eq(MatchStatus::Done))
        .exec(db)
        .await?
        .rows_affected;
    if moved == 0 {
        return Ok(None);
    }
    find(db, inspection_id, rule_id).await
}

#[tracing::instrument(skip_all)]
pub async fn set_assignees<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
    rule_id: i32,
    assignee_user_id: Option<i32>,
    assignee2_user_id: Option<i32>,
) -> Result<action_match::Model, DbErr> {
    ensure_row(db, inspection_id, rule_id).await?;
    action_match::Entity::update_many()
        .col_expr(action_match::Column::AssigneeUserId, Expr::value(assignee_user_id))
        .col_expr(action_match::Column::Assignee2UserId, Expr::value(assignee2_user_id))
        .col_expr(action_match::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(action_match::Column::InspectionId.eq(inspection_id))
        .filter(action_match::Column::RuleId.eq(rule_id))
        .exec(db)
        .await?;
    find(db, inspection_id, rule_id)
        .await?
        .ok_or_else(|| pair_missing(inspection_id, rule_id))
}

#[tracing::instrument(skip_all)]
pub async fn delete_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr> {
    Ok(action_match::Entity::delete_by_id(id)
        .exec(db)
        .await?
        .rows_affected)
}

#[tracing::instrument(skip_all)]
pub async fn delete_for_inspection<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
    rule_id: Option<i32>,
) -> Result<u64, DbErr> {
    let mut query = action_match::Entity::delete_many()
        .filter(action_match::Column::InspectionId.eq(inspection_id));
    if let Some(rule_id) = rule_id {
        query = query.filter(action_match::Column::RuleId.eq(rule_id));
    }
    Ok(query.exec(db).await?.rows_affected)
}
