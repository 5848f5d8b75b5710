use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Form, Json,
};
use axum_extra::extract::CookieJar;
use sea_orm::TransactionTrait;
use tracing::{info, warn};

use crate::{
    dto::{
        request::{
            ForgotPasswordForm, LoginForm, RegisterRequest, ResetPasswordForm, VerifyEmailQuery,
        },
        response::{MessageResponse, TokenResponse, UserResponse},
    },
    error::{AppError, AppResult},
    repositories::user,
    services::session::{self, Rotation},
    utils::{
        cookie::{refresh_cookie, removal_cookie, REFRESH_COOKIE},
        current_user::CurrentUser,
        jwt::{PurposeClaims, TokenPurpose},
        mail, password,
    },
    ServiceState,
};

const MIN_PASSWORD_LEN: usize = 6;

fn bad_login() -> AppError {
    AppError::Unauthorized("Incorrect username, password, or unverified email".to_string())
}

fn check_password_rules(field: &str, password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid_field(
            field,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub async fn login(
    State(state): State<Arc<ServiceState>>,
    jar: CookieJar,
    Form(req): Form<LoginForm>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let username = req.username.trim();
    let Some(account) = user::find_by_username(state.db.as_ref(), username).await? else {
        warn!("Login refused for unknown user {}", username);
        return Err(bad_login());
    };
    if !password::verify_password(&req.password, &account.hashed_password).await
        || !account.is_verified
    {
        warn!("Login refused for {}", account.username);
        return Err(bad_login());
    }

    let tokens = session::open_session(state.db.as_ref(), &state.config.jwt, &account).await?;
    info!("✅ {} logged in", account.username);

    let jar = jar.add(refresh_cookie(
        tokens.refresh_token,
        state.config.auth.cookie_secure,
    ));
    Ok((jar, Json(TokenResponse::bearer(tokens.access_token))))
}

/// Rotation runs outside a transaction so a detected token reuse stays revoked.
/// A request that lost a rotation race leaves the cookie alone, since the
/// winning response is setting its replacement.
pub async fn refresh(
    State(state): State<Arc<ServiceState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>), (CookieJar, AppError)> {
    let Some(presented) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return Err((
            jar.remove(removal_cookie()),
            AppError::Unauthorized("Refresh token missing".to_string()),
        ));
    };

    match session::rotate(state.db.as_ref(), &state.config.jwt, &presented).await {
        Ok(Rotation::Rotated { user, tokens }) => {
            info!("Access token refreshed for {}", user.username);
            let jar = jar.add(refresh_cookie(
                tokens.refresh_token,
                state.config.auth.cookie_secure,
            ));
            Ok((jar, Json(TokenResponse::bearer(tokens.access_token))))
        }
        Ok(Rotation::Superseded) => Err((
            jar,
            AppError::Unauthorized("Refresh token already rotated".to_string()),
        )),
        Err(e) => Err((jar.remove(removal_cookie()), e)),
    }
}

pub async fn logout(
    State(state): State<Arc<ServiceState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        if let Err(e) = session::revoke(state.db.as_ref(), &state.config.jwt, cookie.value()).await
        {
            warn!("Failed to revoke refresh session on logout: {}", e);
        }
    }
    (
        jar.remove(removal_cookie()),
        Json(MessageResponse::new("Logged out")),
    )
}

pub async fn me(CurrentUser(current): CurrentUser) -> Json<UserResponse> {
    Json(current.into())
}

pub async fn register(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<UserResponse>> {
    current.require_admin()?;

    let username = req.username.trim();
    if username.is_empty() {
        return Err(AppError::invalid_field("username", "Username must not be blank"));
    }
    check_password_rules("password", &req.password)?;

    let tx = state.db.begin().await?;
    if user::find_by_username(&tx, username).await?.is_some() {
        return Err(AppError::BadRequest("Username already registered".to_string()));
    }
    let hashed = password::hash_password(&req.password, state.config.auth.bcrypt_cost).await?;
    let created = user::save(&tx, username, hashed, req.role, false).await?;
    tx.commit().await?;

    let token = PurposeClaims::issue(&state.config.jwt, &created.username, TokenPurpose::VerifyEmail)
        .map_err(|e| AppError::Internal(format!("failed to encode verification token: {e}")))?;
    mail::send_verification_email(&state.config.auth, &created.username, &token);

    info!("👤 {} registered {} as {}", current.0.username, created.username, created.role.as_str());
    Ok(Json(created.into()))
}

pub async fn verify_email(
    State(state): State<Arc<ServiceState>>,
    Query(query): Query<VerifyEmailQuery>,
) -> AppResult<Json<MessageResponse>> {
    let username = PurposeClaims::verify(&state.config.jwt, &query.token, TokenPurpose::VerifyEmail)
        .ok_or_else(|| AppError::BadRequest("Invalid or expired token".to_string()))?;

    let account = user::find_by_username(state.db.as_ref(), &username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if !account.is_verified {
        user::mark_verified(state.db.as_ref(), account).await?;
        info!("Email verified for {}", username);
    }
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

pub async fn forgot_password(
    State(state): State<Arc<ServiceState>>,
    Form(req): Form<ForgotPasswordForm>,
) -> AppResult<Json<MessageResponse>> {
    let account = user::find_by_username(state.db.as_ref(), req.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Email not found".to_string()))?;

    let token =
        PurposeClaims::issue(&state.config.jwt, &account.username, TokenPurpose::ResetPassword)
            .map_err(|e| AppError::Internal(format!("failed to encode reset token: {e}")))?;
    mail::send_password_reset_email(&account.username, &token);
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

pub async fn reset_password(
    State(state): State<Arc<ServiceState>>,
    Form(req): Form<ResetPasswordForm>,
) -> AppResult<Json<MessageResponse>> {
    let invalid = || AppError::BadRequest("Invalid or expired token".to_string());
    let username = PurposeClaims::verify(&state.config.jwt, &req.token, TokenPurpose::ResetPassword)
        .ok_or_else(invalid)?;
    check_password_rules("new_password", &req.new_password)?;

    let tx = state.db.begin().await?;
    let account = user::find_by_username(&tx, &username)
        .await?
        .ok_or_else(invalid)?;
    let hashed = password::hash_password(&req.new_password, state.config.auth.bcrypt_cost).await?;
    let account = user::update_password(&tx, account, hashed).await?;
    session::revoke_all(&tx, account.id).await?;
    tx.commit().await?;

    info!("Password reset for {}", account.username);
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use crate::{
        client::{
            api::AuthClient,
            api_error::ApiClientError,
            session_store::{MemorySessionStore, SessionStore},
        },
        config::client::ClientConfig,
        entity::user::Role,
        repositories,
        test_support::{seed_user, spawn_app},
        utils::jwt::{PurposeClaims, TokenPurpose},
    };

    fn refresh_cookie_of(response: &reqwest::Response) -> Option<String> {
        response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|raw| raw.strip_prefix("refresh_token="))
            .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn login_sets_an_http_only_refresh_cookie() {
        let app = spawn_app().await;
        seed_user(app.db(), "ana@example.com", "password123", Role::Admin).await;

        let response = reqwest::Client::new()
            .post(app.endpoint("/token"))
            .form(&[("username", "ana@example.com"), ("password", "password123")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let raw_cookie = response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(raw_cookie.starts_with("refresh_token="));
        assert!(raw_cookie.contains("HttpOnly"));
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["token_type"], "bearer");
        assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn bad_password_and_unverified_accounts_are_refused_alike() {
        let app = spawn_app().await;
        seed_user(app.db(), "ana@example.com", "password123", Role::Admin).await;
        let hashed = crate::utils::password::hash_password("password123", 4).await.unwrap();
        repositories::user::save(app.db(), "new@example.com", hashed, Role::Supervisor, false)
            .await
            .unwrap();

        let http = reqwest::Client::new();
        for (username, secret) in [
            ("ana@example.com", "wrong-password"),
            ("new@example.com", "password123"),
            ("ghost@example.com", "password123"),
        ] {
            let response = http
                .post(app.endpoint("/token"))
                .form(&[("username", username), ("password", secret)])
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{username}");
            let body: Value = response.json().await.unwrap();
            assert_eq!(
                body["detail"],
                "Incorrect username, password, or unverified email"
            );
        }
    }

    #[tokio::test]
    async fn me_requires_a_valid_bearer_token() {
        let app = spawn_app().await;
        let (http, token) = app.seed_and_login("sup@example.com", Role::Supervisor).await;

        let missing = http.get(app.endpoint("/users/me")).send().await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let garbage = http
            .get(app.endpoint("/users/me"))
            .bearer_auth("not-a-token")
            .send()
            .await
            .unwrap();
        assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

        let me: Value = http
            .get(app.endpoint("/users/me"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(me["username"], "sup@example.com");
        assert_eq!(me["role"], "supervisor");
        assert_eq!(me["is_verified"], true);
    }

    async fn refresh_with(
        http: &reqwest::Client,
        app: &crate::test_support::TestApp,
        token: &str,
    ) -> reqwest::Response {
        http.post(app.endpoint("/refresh"))
            .header(reqwest::header::COOKIE, format!("refresh_token={token}"))
            .send()
            .await
            .unwrap()
    }

    async fn first_refresh_cookie(app: &crate::test_support::TestApp) -> String {
        seed_user(app.db(), "ana@example.com", "password123", Role::Admin).await;
        let login = reqwest::Client::new()
            .post(app.endpoint("/token"))
            .form(&[("username", "ana@example.com"), ("password", "password123")])
            .send()
            .await
            .unwrap();
        refresh_cookie_of(&login).unwrap()
    }

    #[tokio::test]
    async fn refresh_rotates_and_the_old_cookie_stops_working() {
        let app = spawn_app().await;
        let first = first_refresh_cookie(&app).await;
        let plain = reqwest::Client::new();

        let rotated = refresh_with(&plain, &app, &first).await;
        assert_eq!(rotated.status(), StatusCode::OK);
        let second = refresh_cookie_of(&rotated).unwrap();
        assert_ne!(first, second);
        let body: Value = rotated.json().await.unwrap();
        assert!(body["access_token"].is_string());

        // The just-replaced cookie is refused but leaves the session alone.
        let replayed = refresh_with(&plain, &app, &first).await;
        assert_eq!(replayed.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(refresh_cookie_of(&replayed), None);

        let rotated_again = refresh_with(&plain, &app, &second).await;
        assert_eq!(rotated_again.status(), StatusCode::OK);
        let third = refresh_cookie_of(&rotated_again).unwrap();

        // Anything older than that revokes the whole session.
        let stale = refresh_with(&plain, &app, &first).await;
        assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(refresh_cookie_of(&stale).as_deref(), Some(""));
        let after_reuse = refresh_with(&plain, &app, &third).await;
        assert_eq!(after_reuse.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn concurrent_refreshes_leave_one_usable_cookie() {
        let app = spawn_app().await;
        let first = first_refresh_cookie(&app).await;
        let plain = reqwest::Client::new();

        let (a, b) = tokio::join!(
            refresh_with(&plain, &app, &first),
            refresh_with(&plain, &app, &first)
        );
        let (winner, loser) = if a.status() == StatusCode::OK { (a, b) } else { (b, a) };
        assert_eq!(winner.status(), StatusCode::OK);
        assert_eq!(loser.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(refresh_cookie_of(&loser), None);

        let next = refresh_cookie_of(&winner).unwrap();
        let followup = refresh_with(&plain, &app, &next).await;
        assert_eq!(followup.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_unauthorized() {
        let app = spawn_app().await;
        let response = reqwest::Client::new()
            .post(app.endpoint("/refresh"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Refresh token missing");
    }

    #[tokio::test]
    async fn logout_revokes_the_refresh_session() {
        let app = spawn_app().await;
        let (http, _) = app.seed_and_login("ana@example.com", Role::Admin).await;

        let logout = http.post(app.endpoint("/logout")).send().await.unwrap();
        assert_eq!(logout.status(), StatusCode::OK);
        let body: Value = logout.json().await.unwrap();
        assert_eq!(body["message"], "Logged out");

        let refresh = http.post(app.endpoint("/refresh")).send().await.unwrap();
        assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);

        let again = http.post(app.endpoint("/logout")).send().await.unwrap();
        assert_eq!(again.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admins_register_unverified_users_who_verify_by_link() {
        let app = spawn_app().await;
        let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;

        let short = http
            .post(app.endpoint("/register"))
            .bearer_auth(&admin)
            .json(&json!({ "username": "sup@example.com", "password": "123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(short.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let created: Value = http
            .post(app.endpoint("/register"))
            .bearer_auth(&admin)
            .json(&json!({ "username": "sup@example.com", "password": "secret99" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(created["role"], "supervisor");
        assert_eq!(created["is_verified"], false);

        let duplicate = http
            .post(app.endpoint("/register"))
            .bearer_auth(&admin)
            .json(&json!({ "username": "sup@example.com", "password": "secret99" }))
            .send()
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

        let refused = reqwest::Client::new()
            .post(app.endpoint("/token"))
            .form(&[("username", "sup@example.com"), ("password", "secret99")])
            .send()
            .await
            .unwrap();
        assert_eq!(refused.status(), StatusCode::UNAUTHORIZED);

        let token = PurposeClaims::issue(
            &app.state.config.jwt,
            "sup@example.com",
            TokenPurpose::VerifyEmail,
        )
        .unwrap();
        let verified = http
            .get(app.endpoint("/verify-email"))
            .query(&[("token", token.as_str())])
            .send()
            .await
            .unwrap();
        assert_eq!(verified.status(), StatusCode::OK);

        app.login("sup@example.com", "secret99").await;
    }

    #[tokio::test]
    async fn supervisors_cannot_register_users() {
        let app = spawn_app().await;
        let (http, token) = app.seed_and_login("sup@example.com", Role::Supervisor).await;
        let response = http
            .post(app.endpoint("/register"))
            .bearer_auth(&token)
            .json(&json!({ "username": "x@example.com", "password": "secret99" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn password_reset_replaces_the_password_and_ends_sessions() {
        let app = spawn_app().await;
        let (http, _) = app.seed_and_login("ana@example.com", Role::Admin).await;

        let unknown = http
            .post(app.endpoint("/forgot-password"))
            .form(&[("email", "ghost@example.com")])
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let sent = http
            .post(app.endpoint("/forgot-password"))
            .form(&[("email", "ana@example.com")])
            .send()
            .await
            .unwrap();
        assert_eq!(sent.status(), StatusCode::OK);

        let bogus = http
            .post(app.endpoint("/reset-password"))
            .form(&[("token", "bogus"), ("new_password", "brand-new")])
            .send()
            .await
            .unwrap();
        assert_eq!(bogus.status(), StatusCode::BAD_REQUEST);

        let token = PurposeClaims::issue(
            &app.state.config.jwt,
            "ana@example.com",
            TokenPurpose::ResetPassword,
        )
        .unwrap();
        let reset = http
            .post(app.endpoint("/reset-password"))
            .form(&[("token", token.as_str()), ("new_password", "brand-new")])
            .send()
            .await
            .unwrap();
        assert_eq!(reset.status(), StatusCode::OK);

        let refresh = http.post(app.endpoint("/refresh")).send().await.unwrap();
        assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
        app.login("ana@example.com", "brand-new").await;
    }

    fn client_for(app: &crate::test_support::TestApp) -> (AuthClient, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let config = ClientConfig {
            base_url: app.url.clone(),
            ..Default::default()
        };
        (AuthClient::new(&config, store.clone()).unwrap(), store)
    }

    #[tokio::test]
    async fn api_client_logs_in_and_renews_a_stale_token() {
        let app = spawn_app().await;
        seed_user(app.db(), "ana@example.com", "password123", Role::Admin).await;
        let (client, store) = client_for(&app);

        let me = client.login("ana@example.com", "password123").await.unwrap();
        assert_eq!(me.username, "ana@example.com");
        assert_eq!(store.role().as_deref(), Some("admin"));
        assert!(store.refresh_cookie().is_some());

        store.set_access_token("stale-token").unwrap();
        let users: Vec<Value> = client.get_json("/users", &[]).await.unwrap();
        assert_eq!(users.len(), 1);
        let renewed = store.access_token().unwrap();
        assert_ne!(renewed, "stale-token");

        client.logout().await.unwrap();
        assert_eq!(store.access_token(), None);
        assert!(matches!(
            client.me().await,
            Err(ApiClientError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn api_client_surfaces_forbidden_without_refreshing() {
        let app = spawn_app().await;
        seed_user(app.db(), "sup@example.com", "password123", Role::Supervisor).await;
        let (client, store) = client_for(&app);
        client.login("sup@example.com", "password123").await.unwrap();
        let token = store.access_token();

        let err = client.get_json::<Value>("/users", &[]).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(store.access_token(), token);
    }
}
