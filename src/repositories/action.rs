use crate::entity::{action, action_match, rule};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

#[tracing::instrument(skip_all)]
pub async fn save<C: ConnectionTrait>(db: &C, name: &str) -> Result<action::Model, DbErr> {
    action::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[tracing::instrument(skip_all)]
pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<action::Model>, DbErr> {
    action::Entity::find()
        .order_by_asc(action::Column::Name)
        .all(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<action::Model>, DbErr> {
    action::Entity::find_by_id(id).one(db).await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<action::Model>, DbErr> {
    action::Entity::find()
        .filter(action::Column::Name.eq(name))
        .one(db)
        .await
}

/// Removes the action together with its rules and their match state.
#[tracing::instrument(skip_all)]
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr> {
    let rule_ids: Vec<i32> = rule::Entity::find()
        .select_only()
        .column(rule::Column::Id)
        .filter(rule::Column::ActionId.eq(id))
        .into_tuple()
        .all(db)
        .await?;

    if !rule_ids.is_empty() {
        action_match::Entity::delete_many()
            .filter(action_match::Column::RuleId.is_in(rule_ids.clone()))
            .exec(db)
            .await?;
        rule::Entity::delete_many()
            .filter(rule::Column::Id.is_in(rule_ids))
            .exec(db)
            .await?;
    }

    Ok(action::Entity::delete_by_id(id).exec(db).await?.rows_affected)
}
