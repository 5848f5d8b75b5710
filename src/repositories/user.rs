use crate::entity::{action_match, rule, user, user::Role};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, Value,
};

#[tracing::instrument(skip_all)]
pub async fn save<C: ConnectionTrait>(
    db: &C,
    username: &str,
    hashed_password: String,
    role: Role,
    is_verified: bool,
) -> Result<user::Model, DbErr> {
    user::ActiveModel {
        username: Set(username.to_string()),
        hashed_password: Set(hashed_password),
        role: Set(role),
        is_verified: Set(is_verified),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(id).one(db).await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<user::Model>, DbErr> {
    user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn exist_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool, DbErr> {
    Ok(find_by_id(db, id).await?.is_some())
}

#[tracing::instrument(skip_all)]
pub async fn mark_verified<C: ConnectionTrait>(
    db: &C,
    model: user::Model,
) -> Result<user::Model, DbErr> {
    let mut active: user::ActiveModel = model.into();
    active.is_verified = Set(true);
    active.update(db).await
}

#[tracing::instrument(skip_all)]
pub async fn update_profile<C: ConnectionTrait>(
    db: &C,
    model: user::Model,
    role: Option<Role>,
    is_verified: Option<bool>,
) -> Result<user::Model, DbErr> {
    let mut active: user::ActiveModel = model.into();
    if let Some(role) = role {
        active.role = Set(role);
    }
    if let Some(is_verified) = is_verified {
        active.is_verified = Set(is_verified);
    }
    active.update(db).await
}

#[tracing::instrument(skip_all)]
pub async fn update_password<C: ConnectionTrait>(
    db: &C,
    model: user::Model,
    hashed_password: String,
) -> Result<user::Model, DbErr> {
    let mut active: user::ActiveModel = model.into();
    active.hashed_password = Set(hashed_password);
    active.update(db).await
}

/// Deletes the user and detaches every rule and match that points at it.
#[tracing::instrument(skip_all)]
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr> {
    let none = || Expr::value(Value::Int(None));

    rule::Entity::update_many()
        .col_expr(rule::Column::AssigneeUserId, none())
        .filter(rule::Column::AssigneeUserId.eq(id))
        .exec(db)
        .await?;
    action_match::Entity::update_many()
        .col_expr(action_match::Column::AssigneeUserId, none())
        .filter(action_match::Column::AssigneeUserId.eq(id))
        .exec(db)
        .await?;
    action_match::Entity::update_many()
        .col_expr(action_match::Column::Assignee2UserId, none())
        .filter(action_match::Column::Assignee2UserId.eq(id))
        .exec(db)
        .await?;

    super::refresh_session::delete_by_user_id(db, id).await?;
    Ok(user::Entity::delete_by_id(id).exec(db).await?.rows_affected)
}
