use crate::entity::location;
use chrono::Utc;
use sea_orm::{
    sea_query::{Alias, Expr, Order, Query},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

#[tracing::instrument(skip_all)]
pub async fn save<C: ConnectionTrait>(
    db: &C,
    username: &str,
    latitude: f64,
    longitude: f64,
) -> Result<location::Model, DbErr> {
    location::ActiveModel {
        username: Set(username.to_string()),
        latitude: Set(latitude),
        longitude: Set(longitude),
        timestamp: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[tracing::instrument(skip_all)]
pub async fn find_recent<C: ConnectionTrait>(
    db: &C,
    username: Option<&str>,
    limit: u64,
) -> Result<Vec<location::Model>, DbErr> {
    let mut query = location::Entity::find();
    if let Some(username) = username {
        query = query.filter(location::Column::Username.eq(username));
    }
    query
        .order_by_desc(location::Column::Timestamp)
        .order_by_desc(location::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// The newest ping of every user, newest first. Within one user a tie on
/// `timestamp` goes to the later row.
#[tracing::instrument(skip_all)]
pub async fn find_latest_per_user<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<location::Model>, DbErr> {
    let newer = Alias::new("newer");
    let newest_of_user = Query::select()
        .column((newer.clone(), location::Column::Id))
        .from_as(location::Entity, newer.clone())
        .and_where(
            Expr::col((newer.clone(), location::Column::Username))
                .equals((location::Entity, location::Column::Username)),
        )
        .order_by((newer.clone(), location::Column::Timestamp), Order::Desc)
        .order_by((newer, location::Column::Id), Order::Desc)
        .limit(1)
        .to_owned();

    location::Entity::find()
        .filter(Expr::col((location::Entity, location::Column::Id)).in_subquery(newest_of_user))
        .order_by_desc(location::Column::Timestamp)
        .order_by_desc(location::Column::Id)
        .all(db)
        .await
}
