use crate::{
    entity::{action, action_match, rule},
    services::action_center::RuleDraft,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

#[tracing::instrument(skip_all)]
pub async fn save<C: ConnectionTrait>(db: &C, draft: RuleDraft) -> Result<rule::Model, DbErr> {
    rule::ActiveModel {
        rule_id: Set(draft.rule_id),
        city: Set(draft.city),
        field: Set(draft.field.as_str().to_string()),
        option_value: Set(draft.option_value),
        action_id: Set(draft.action_id),
        priority: Set(draft.priority),
        assignee_user_id: Set(draft.assignee_user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[tracing::instrument(skip_all)]
pub async fn replace<C: ConnectionTrait>(
    db: &C,
    model: rule::Model,
    draft: RuleDraft,
) -> Result<rule::Model, DbErr> {
    let mut active: rule::ActiveModel = model.into();
    active.rule_id = Set(draft.rule_id);
    active.city = Set(draft.city);
    active.field = Set(draft.field.as_str().to_string());
    active.option_value = Set(draft.option_value);
    active.action_id = Set(draft.action_id);
    active.priority = Set(draft.priority);
    active.assignee_user_id = Set(draft.assignee_user_id);
    active.update(db).await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<rule::Model>, DbErr> {
    rule::Entity::find_by_id(id).one(db).await
}

#[tracing::instrument(skip_all)]
pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<rule::Model>, DbErr> {
    rule::Entity::find()
        .order_by_asc(rule::Column::RuleId)
        .order_by_asc(rule::Column::Id)
        .all(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn find_with_action<C: ConnectionTrait>(
    db: &C,
    rule_id: Option<i32>,
    field: Option<&str>,
) -> Result<Vec<(rule::Model, Option<action::Model>)>, DbErr> {
    let mut query = rule::Entity::find().find_also_related(action::Entity);
    if let Some(rule_id) = rule_id {
        query = query.filter(rule::Column::RuleId.eq(rule_id));
    }
    if let Some(field) = field {
        query = query.filter(rule::Column::Field.eq(field));
    }
    query
        .order_by_asc(rule::Column::RuleId)
        .order_by_asc(rule::Column::Id)
        .all(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr> {
    action_match::Entity::delete_many()
        .filter(action_match::Column::RuleId.eq(id))
        .exec(db)
        .await?;
    Ok(rule::Entity::delete_by_id(id).exec(db).await?.rows_affected)
}
