use std::sync::Arc;

use crate::controllers::auth;
use crate::ServiceState;
use axum::routing::{get, post};

pub fn add_routers(router: axum::Router<Arc<ServiceState>>) -> axum::Router<Arc<ServiceState>> {
    router
        .route("/token", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/users/me", get(auth::me))
        .route("/register", post(auth::register))
        .route("/verify-email", get(auth::verify_email))
        .route("/verify-email/", get(auth::verify_email))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
}
