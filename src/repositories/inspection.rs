use crate::{
    entity::{action_match, inspection},
    services::inspection::InspectionDraft,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

fn apply(active: &mut inspection::ActiveModel, draft: InspectionDraft) {
    active.rider_id = Set(draft.rider_id);
    active.id_number = Set(draft.id_number);
    active.box_serial_number = Set(draft.box_serial_number);
    active.plate_number = Set(draft.plate_number);
    active.helmet = Set(draft.helmet);
    active.box_status = Set(draft.box_status);
    active.account = Set(draft.account);
    active.parking = Set(draft.parking);
    active.appearance = Set(draft.appearance);
    active.driving = Set(draft.driving);
    active.mfc_status = Set(draft.mfc_status);
    active.courier_behavior = Set(draft.courier_behavior);
    active.city = Set(draft.city);
    active.location = Set(draft.location);
    active.comments = Set(draft.comments);
}

#[tracing::instrument(skip_all)]
pub async fn save<C: ConnectionTrait>(
    db: &C,
    draft: InspectionDraft,
    inspected_by: &str,
    image_url: Option<String>,
) -> Result<inspection::Model, DbErr> {
    let mut active = inspection::ActiveModel {
        inspected_by: Set(inspected_by.to_string()),
        image_url: Set(image_url),
        timestamp: Set(Utc::now()),
        ..Default::default()
    };
    apply(&mut active, draft);
    active.insert(db).await
}

/// Replaces every editable column. `image_url = None` keeps the stored image.
#[tracing::instrument(skip_all)]
pub async fn replace<C: ConnectionTrait>(
    db: &C,
    model: inspection::Model,
    draft: InspectionDraft,
    image_url: Option<String>,
) -> Result<inspection::Model, DbErr> {
    let mut active: inspection::ActiveModel = model.into();
    apply(&mut active, draft);
    if let Some(url) = image_url {
        active.image_url = Set(Some(url));
    }
    active.update(db).await
}

#[tracing::instrument(skip_all)]
pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<inspection::Model>, DbErr> {
    inspection::Entity::find()
        .order_by_desc(inspection::Column::Timestamp)
        .order_by_desc(inspection::Column::Id)
        .all(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<inspection::Model>, DbErr> {
    inspection::Entity::find_by_id(id).one(db).await
}

#[tracing::instrument(skip_all)]
pub async fn search<C: ConnectionTrait>(
    db: &C,
    city: Option<&str>,
    location: Option<&str>,
) -> Result<Vec<inspection::Model>, DbErr> {
    let mut query = inspection::Entity::find();
    if let Some(city) = city {
        query = query.filter(inspection::Column::City.eq(city));
    }
    if let Some(location) = location {
        query = query.filter(inspection::Column::Location.eq(location));
    }
    query
        .order_by_desc(inspection::Column::Timestamp)
        .order_by_desc(inspection::Column::Id)
        .all(db)
        .await
}

#[tracing::instrument(skip_all)]
pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr> {
    action_match::Entity::delete_many()
        .filter(action_match::Column::InspectionId.eq(id))
        .exec(db)
        .await?;
    Ok(inspection::Entity::delete_by_id(id)
        .exec(db)
        .await?
        .rows_affected)
}
