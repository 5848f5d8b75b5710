use sea_orm::entity::prelude::*;

use crate::services::checklist::ChecklistField;

#[derive(Debug, PartialEq, Eq, Clone, DeriveEntityModel)]
#[sea_orm(table_name = "inspections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub rider_id: Option<i32>,
    pub id_number: Option<String>,
    pub box_serial_number: Option<String>,
    pub plate_number: Option<String>,
    #[sea_orm(indexed)]
    pub inspected_by: String,
    pub helmet: Option<String>,
    #[sea_orm(column_name = "box")]
    pub box_status: Option<String>,
    pub account: Option<String>,
    pub parking: Option<String>,
    pub appearance: Option<String>,
    pub driving: Option<String>,
    pub mfc_status: Option<String>,
    pub courier_behavior: Option<String>,
    #[sea_orm(indexed)]
    pub city: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub comments: Option<String>,
    pub timestamp: DateTimeUtc,
}

impl Model {
    /// The recorded option for one checklist field.
    pub fn checklist_value(&self, field: ChecklistField) -> Option<&str> {
        let value = match field {
            ChecklistField::Helmet => &self.helmet,
            ChecklistField::Box => &self.box_status,
            ChecklistField::Account => &self.account,
            ChecklistField::Parking => &self.parking,
            ChecklistField::Appearance => &self.appearance,
            ChecklistField::Driving => &self.driving,
            ChecklistField::MfcStatus => &self.mfc_status,
            ChecklistField::CourierBehavior => &self.courier_behavior,
        };
        value.as_deref()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rider::Entity",
        from = "Column::RiderId",
        to = "super::rider::Column::RiderId",
        on_delete = "SetNull"
    )]
    Rider,
    #[sea_orm(has_many = "super::action_match::Entity")]
    ActionMatch,
}

impl Related<super::rider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rider.def()
    }
}

impl Related<super::action_match::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActionMatch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
