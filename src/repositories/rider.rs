use crate::{dto::request::RiderRequest, entity::inspection, entity::rider};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, Value,
};

#[tracing::instrument(skip_all)]
pub async fn save<C: ConnectionTrait>(db: &C, req: RiderRequest) -> Result<rider::Model, DbErr> {
    rider::ActiveModel {
        first_name: Set(req.first_name),
        first_last_name: Set(req.first_last_name),
        id_number: Set(req.id_number),
        city_code: Set(req.city_code),
        vehicle_type: Set(req.vehicle_type),
        joined_at: Set(req.joined_at.unwrap_or_else(Utc::now)),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[tracing::instrument(skip_all)]
pub async fn replace<C: ConnectionTrait>(
    db: &C,
    model: rider::Model,
    req: RiderRequest,
) -> Result<rider::Model, DbErr> {
    let joined_at = req.joined_at.unwrap_or(model.joined_at);
    let mut active: rider::ActiveModel = model.into();
    active.first_name = Set(req.first_name);
    active.first_last_name = Set(req.first_last_name);
    active.id_number = Set(req.id_number);
    active.city_code = Set(req.city_code);
    active.vehicle_type = Set(req.vehicle_type);
    active.joined_at = Set(joined_at);
    active.update(db).await
}

#[tracing::instrument(skip_all)]
pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<rider::Model>, DbErr> {
    rider::Entity::find()
        .order_by_desc(rider::Column::JoinedAt)
        .order_by_desc(rider::Column::RiderId)
        .all(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    rider_id: i32,
) -> Result<Option<rider::Model>, DbErr> {
    rider::Entity::find_by_id(rider_id).one(db).await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_id_number<C: ConnectionTrait>(
    db: &C,
    id_number: &str,
) -> Result<Option<rider::Model>, DbErr> {
    rider::Entity::find()
        .filter(rider::Column::IdNumber.eq(id_number))
        .order_by_asc(rider::Column::RiderId)
        .one(db)
        .await
}

/// Inspections keep their `id_number`; only the link is cleared.
#[tracing::instrument(skip_all)]
pub async fn delete<C: ConnectionTrait>(db: &C, rider_id: i32) -> Result<u64, DbErr> {
    inspection::Entity::update_many()
        .col_expr(inspection::Column::RiderId, Expr::value(Value::Int(None)))
        .filter(inspection::Column::RiderId.eq(rider_id))
        .exec(db)
        .await?;
    Ok(rider::Entity::delete_by_id(rider_id)
        .exec(db)
        .await?
        .rows_affected)
}
