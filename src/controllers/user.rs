use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Form, Json,
};
use sea_orm::TransactionTrait;
use tracing::info;

use crate::{
    dto::{request::UpdateUserForm, response::UserResponse},
    error::{AppError, AppResult},
    repositories::user,
    services::session,
    utils::{current_user::CurrentUser, password},
    ServiceState,
};

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

pub async fn list(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    current.require_admin()?;
    let users = user::find_all(state.db.as_ref()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn update(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Path(username): Path<String>,
    Form(req): Form<UpdateUserForm>,
) -> AppResult<Json<UserResponse>> {
    current.require_admin()?;

    let tx = state.db.begin().await?;
    let mut account = user::find_by_username(&tx, &username)
        .await?
        .ok_or_else(user_not_found)?;

    if req.role.is_some() || req.is_verified.is_some() {
        account = user::update_profile(&tx, account, req.role, req.is_verified).await?;
    }
    if let Some(new_password) = req.new_password.filter(|p| !p.is_empty()) {
        let hashed = password::hash_password(&new_password, state.config.auth.bcrypt_cost).await?;
        account = user::update_password(&tx, account, hashed).await?;
        session::revoke_all(&tx, account.id).await?;
    }
    tx.commit().await?;

    info!("👤 {} updated user {}", current.0.username, account.username);
    Ok(Json(account.into()))
}

pub async fn delete(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<StatusCode> {
    current.require_admin()?;
    if current.0.username == username {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let tx = state.db.begin().await?;
    let account = user::find_by_username(&tx, &username)
        .await?
        .ok_or_else(user_not_found)?;
    user::delete(&tx, account.id).await?;
    tx.commit().await?;

    info!("👤 {} deleted user {}", current.0.username, username);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::Value;

    use crate::{entity::user::Role, test_support::spawn_app};

    #[tokio::test]
    async fn admins_cannot_delete_themselves() {
        let app = spawn_app().await;
        let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;

        let response = http
            .delete(app.endpoint("/users/by-username/ana@example.com"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "You cannot delete your own account");
    }

    #[tokio::test]
    async fn deleted_users_lose_access_immediately() {
        let app = spawn_app().await;
        let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;
        let (_, supervisor) = app.seed_and_login("sup@example.com", Role::Supervisor).await;

        let deleted = http
            .delete(app.endpoint("/users/by-username/sup@example.com"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let me = http
            .get(app.endpoint("/users/me"))
            .bearer_auth(&supervisor)
            .send()
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

        let missing = http
            .delete(app.endpoint("/users/by-username/sup@example.com"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn promotions_apply_to_the_next_request() {
        let app = spawn_app().await;
        let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;
        let (_, supervisor) = app.seed_and_login("sup@example.com", Role::Supervisor).await;

        let before = http
            .get(app.endpoint("/users"))
            .bearer_auth(&supervisor)
            .send()
            .await
            .unwrap();
        assert_eq!(before.status(), StatusCode::FORBIDDEN);

        let updated: Value = http
            .put(app.endpoint("/users/by-username/sup@example.com"))
            .bearer_auth(&admin)
            .form(&[("role", "admin")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(updated["role"], "admin");

        let users: Vec<Value> = http
            .get(app.endpoint("/users"))
            .bearer_auth(&supervisor)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(users.len(), 2);
    }
}
