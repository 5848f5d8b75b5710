use sea_orm::entity::prelude::*;

/// A geolocation ping sent by a supervisor's device.
#[derive(Debug, PartialEq, Clone, DeriveEntityModel)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub username: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
