use sea_orm::entity::prelude::*;

#[derive(Debug, PartialEq, Eq, Clone, DeriveEntityModel)]
#[sea_orm(table_name = "riders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub rider_id: i32,
    pub first_name: String,
    pub first_last_name: String,
    #[sea_orm(indexed)]
    pub id_number: String,
    pub city_code: Option<String>,
    pub vehicle_type: Option<String>,
    pub joined_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inspection::Entity")]
    Inspection,
}

impl Related<super::inspection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inspection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
