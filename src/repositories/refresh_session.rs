use crate::entity::refresh_session;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

#[tracing::instrument(skip_all)]
pub async fn save<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    user_id: i32,
    token_hash: String,
    expires_at: DateTime<Utc>,
) -> Result<refresh_session::Model, DbErr> {
    let now = Utc::now();
    refresh_session::ActiveModel {
        id: Set(id),
        user_id: Set(user_id),
        token_hash: Set(token_hash),
        previous_hash: Set(None),
        rotated_at: Set(None),
        revoked: Set(false),
        expires_at: Set(expires_at),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<refresh_session::Model>, DbErr> {
    refresh_session::Entity::find_by_id(id).one(db).await
}

/// Swaps the stored hash only if it still equals `current_hash`. Returns
/// `false` when another rotation got there first.
#[tracing::instrument(skip_all)]
pub async fn rotate<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    current_hash: &str,
    token_hash: String,
    expires_at: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let now = Utc::now();
    let swapped = refresh_session::Entity::update_many()
        .col_expr(refresh_session::Column::TokenHash, Expr::value(token_hash))
        .col_expr(
            refresh_session::Column::PreviousHash,
            Expr::value(Some(current_hash.to_string())),
        )
        .col_expr(refresh_session::Column::RotatedAt, Expr::value(Some(now)))
        .col_expr(refresh_session::Column::ExpiresAt, Expr::value(expires_at))
        .col_expr(refresh_session::Column::UpdatedAt, Expr::value(now))
        .filter(refresh_session::Column::Id.eq(id))
        .filter(refresh_session::Column::TokenHash.eq(current_hash))
        .filter(refresh_session::Column::Revoked.eq(false))
        .exec(db)
        .await?
        .rows_affected;
    Ok(swapped > 0)
}

#[tracing::instrument(skip_all)]
pub async fn revoke<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
    Ok(refresh_session::Entity::update_many()
        .col_expr(refresh_session::Column::Revoked, Expr::value(true))
        .col_expr(refresh_session::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(refresh_session::Column::Id.eq(id))
        .exec(db)
        .await?
        .rows_affected)
}

#[tracing::instrument(skip_all)]
pub async fn revoke_all_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    Ok(refresh_session::Entity::update_many()
        .col_expr(refresh_session::Column::Revoked, Expr::value(true))
        .col_expr(refresh_session::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(refresh_session::Column::UserId.eq(user_id))
        .filter(refresh_session::Column::Revoked.eq(false))
        .exec(db)
        .await?
        .rows_affected)
}

#[tracing::instrument(skip_all)]
pub async fn delete_by_user_id<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    Ok(refresh_session::Entity::delete_many()
        .filter(refresh_session::Column::UserId.eq(user_id))
        .exec(db)
        .await?
        .rows_affected)
}
