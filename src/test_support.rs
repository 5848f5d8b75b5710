//! Shared fixtures for the in-crate tests: an in-memory SQLite database with
//! the full schema, and a live router bound to an ephemeral port.

use std::{path::PathBuf, sync::Arc};

use reqwest::Client;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    client::db::DatabaseClientExt,
    config::{
        auth::AuthConfig, jwt::JWTConfig, upload::UploadConfig, ServiceConfig,
    },
    entity::{user, user::Role},
    repositories,
    routes::create_router,
    utils::password,
    ServiceState,
};

pub const TEST_BCRYPT_COST: u32 = 4;

pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    db.init_schema().await.unwrap();
    db
}

pub fn jwt_config() -> JWTConfig {
    JWTConfig {
        access_token_secret: "test-access-secret".to_string(),
        refresh_token_secret: "test-refresh-secret".to_string(),
        access_token_expired_date: 1800,
        refresh_token_expired_date: 3600,
        reset_token_expired_date: 600,
        verify_token_expired_date: 600,
    }
}

pub fn service_config() -> ServiceConfig {
    ServiceConfig {
        jwt: jwt_config(),
        auth: AuthConfig {
            cookie_secure: false,
            bcrypt_cost: TEST_BCRYPT_COST,
            public_base_url: "http://localhost:8000".to_string(),
            ..Default::default()
        },
        upload: UploadConfig {
            dir: std::env::temp_dir().join(format!("inspection-uploads-{}", Uuid::new_v4())),
            max_bytes: 1024 * 1024,
        },
        ..Default::default()
    }
}

pub async fn seed_user(
    db: &DatabaseConnection,
    username: &str,
    secret: &str,
    role: Role,
) -> user::Model {
    let hashed = password::hash_password(secret, TEST_BCRYPT_COST).await.unwrap();
    repositories::user::save(db, username, hashed, role, true)
        .await
        .unwrap()
}

pub struct TestApp {
    pub url: String,
    pub state: Arc<ServiceState>,
}

impl TestApp {
    pub fn db(&self) -> &DatabaseConnection {
        self.state.db.as_ref()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.state.config.upload.dir.clone()
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    /// A cookie-keeping client logged in as `username`, with its access token.
    pub async fn login(&self, username: &str, secret: &str) -> (Client, String) {
        let http = Client::builder().cookie_store(true).build().unwrap();
        let response = http
            .post(self.endpoint("/token"))
            .form(&[("username", username), ("password", secret)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK, "login of {username}");
        let body: Value = response.json().await.unwrap();
        let token = body["access_token"].as_str().unwrap().to_string();
        (http, token)
    }

    pub async fn seed_and_login(&self, username: &str, role: Role) -> (Client, String) {
        seed_user(self.db(), username, "password123", role).await;
        self.login(username, "password123").await
    }
}

pub async fn spawn_app() -> TestApp {
    let config = service_config();
    let state = Arc::new(ServiceState {
        config: Arc::new(config),
        db: Arc::new(memory_db().await),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        url: format!("http://{addr}"),
        state,
    }
}
