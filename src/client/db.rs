use std::time::Duration;

use sea_orm::{
    sea_query::Index, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, Schema,
};
use tracing::info;

use crate::{config::ServiceConfig, entity};

pub type DatabaseClient = DatabaseConnection;

pub trait DatabaseClientExt: Sized {
    fn build_from_config(
        config: &ServiceConfig,
    ) -> impl std::future::Future<Output = Result<Self, String>>;
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), DbErr>>;
}

impl DatabaseClientExt for DatabaseClient {
    async fn build_from_config(config: &ServiceConfig) -> Result<Self, String> {
        let mut opt = ConnectOptions::new(config.db.get_url());
        opt.max_connections(config.db.max_connections)
            .min_connections(config.db.min_connections)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(false);
        let db = Database::connect(opt)
            .await
            .map_err(|e| format!("Error in connecting to database: {}", e))?;
        Ok(db)
    }

    /// Creates missing tables and indexes, parents before children.
    async fn init_schema(&self) -> Result<(), DbErr> {
        create_table(self, entity::user::Entity).await?;
        create_table(self, entity::rider::Entity).await?;
        create_table(self, entity::action::Entity).await?;
        create_table(self, entity::inspection::Entity).await?;
        create_table(self, entity::rule::Entity).await?;
        create_table(self, entity::action_match::Entity).await?;
        create_pair_index(self).await?;
        create_table(self, entity::location::Entity).await?;
        create_table(self, entity::refresh_session::Entity).await?;
        info!("Database schema is ready");
        Ok(())
    }
}

async fn create_table<E: EntityTrait>(db: &DatabaseClient, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }
    Ok(())
}

/// At most one state row per `(inspection, rule)` pair.
async fn create_pair_index(db: &DatabaseClient) -> Result<(), DbErr> {
    use entity::action_match::{Column, Entity};

    let backend = db.get_database_backend();
    let index = Index::create()
        .name("uq_action_matches_pair")
        .table(Entity)
        .col(Column::InspectionId)
        .col(Column::RuleId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&index)).await?;
    Ok(())
}
