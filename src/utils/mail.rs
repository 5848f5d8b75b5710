//! Outgoing account mail. Delivery is handed to the log for the operator's
//! mail relay to pick up; the links are the only payload.

use tracing::info;

use crate::config::auth::AuthConfig;

pub fn verification_link(config: &AuthConfig, token: &str) -> String {
    format!("{}/verify-email?token={token}", config.public_base_url)
}

#[tracing::instrument(skip_all, fields(recipient = %username))]
pub fn send_verification_email(config: &AuthConfig, username: &str, token: &str) {
    info!(
        target: "mail",
        subject = "Verify your email",
        "Please verify your email by opening {}",
        verification_link(config, token)
    );
}

#[tracing::instrument(skip_all, fields(recipient = %username))]
pub fn send_password_reset_email(username: &str, token: &str) {
    info!(
        target: "mail",
        subject = "Reset your password",
        "Use this token to reset your password: {}",
        token
    );
}
