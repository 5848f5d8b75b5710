use sea_orm::entity::prelude::*;

/// Server side of the refresh cookie. The cookie carries a JWT whose `sid`
/// names this row; only the SHA-256 of the current token is stored, plus
/// the hash it replaced so a racing duplicate refresh can be told apart
/// from a replay.
#[derive(Debug, PartialEq, Eq, Clone, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub token_hash: String,
    pub previous_hash: Option<String>,
    pub rotated_at: Option<DateTimeUtc>,
    pub revoked: bool,
    pub expires_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
