use tracing::info;

use crate::{
    client::db::DatabaseClient, config::ServiceConfig, entity::user::Role, error::AppError,
    repositories, utils::password,
};

/// Creates the configured first admin if that username does not exist yet.
pub async fn ensure_admin(db: &DatabaseClient, config: &ServiceConfig) -> Result<bool, AppError> {
    let (Some(username), Some(secret)) = (
        config.auth.bootstrap_admin_username.as_deref(),
        config.auth.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(false);
    };

    if repositories::user::find_by_username(db, username)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let hashed = password::hash_password(secret, config.auth.bcrypt_cost).await?;
    repositories::user::save(db, username, hashed, Role::Admin, true).await?;
    info!("👤 Bootstrap admin {} created", username);
    Ok(true)
}
