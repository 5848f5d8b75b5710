use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    config::jwt::JWTConfig,
    entity::{user, user::Role},
};

pub static DECODE_HEADER: Lazy<Validation> = Lazy::new(|| {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
});
pub static ENCODE_HEADER: Lazy<Header> = Lazy::new(|| Header::new(Algorithm::HS256));

fn now() -> i64 {
    Utc::now().timestamp()
}

/// `now + seconds`, clamped instead of wrapping.
fn expires_after(now: i64, seconds: u64) -> i64 {
    now.saturating_add(i64::try_from(seconds).unwrap_or(i64::MAX))
}

/// Claims of both the access and the refresh token; they differ only in
/// signing key and lifetime. `sid` names the refresh session, `jti` makes
/// every minted token distinct.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct UserClaims {
    pub iat: i64,
    pub exp: i64,
    pub sub: String,
    pub uid: i32,
    pub role: Role,
    pub sid: Uuid,
    pub jti: Uuid,
}

impl UserClaims {
    pub fn new(duration: Duration, user: &user::Model, session_id: Uuid) -> Self {
        let now = now();
        Self {
            iat: now,
            exp: expires_after(now, duration.as_secs()),
            sub: user.username.clone(),
            uid: user.id,
            role: user.role,
            sid: session_id,
            jti: Uuid::new_v4(),
        }
    }

    pub fn decode(token: &str, key: &str) -> Result<TokenData<Self>, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(key.as_ref()),
            &DECODE_HEADER,
        )
    }

    pub fn encode(&self, key: &str) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(
            &ENCODE_HEADER,
            self,
            &EncodingKey::from_secret(key.as_ref()),
        )
    }
}

pub fn generate_token_pair(
    config: &JWTConfig,
    user: &user::Model,
    session_id: Uuid,
) -> Result<(String, String), jsonwebtoken::errors::Error> {
    let access_token = UserClaims::new(
        Duration::from_secs(config.access_token_expired_date),
        user,
        session_id,
    )
    .encode(&config.access_token_secret)?;

    let refresh_token = UserClaims::new(
        Duration::from_secs(config.refresh_token_expired_date),
        user,
        session_id,
    )
    .encode(&config.refresh_token_secret)?;

    Ok((access_token, refresh_token))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    VerifyEmail,
    ResetPassword,
}

/// Single-purpose token mailed to a user (verification link, password reset).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct PurposeClaims {
    pub iat: i64,
    pub exp: i64,
    pub sub: String,
    pub purpose: TokenPurpose,
}

impl PurposeClaims {
    pub fn issue(
        config: &JWTConfig,
        username: &str,
        purpose: TokenPurpose,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let lifetime = match purpose {
            TokenPurpose::VerifyEmail => config.verify_token_expired_date,
            TokenPurpose::ResetPassword => config.reset_token_expired_date,
        };
        let now = now();
        let claims = Self {
            iat: now,
            exp: expires_after(now, lifetime),
            sub: username.to_string(),
            purpose,
        };
        jsonwebtoken::encode(
            &ENCODE_HEADER,
            &claims,
            &EncodingKey::from_secret(config.access_token_secret.as_ref()),
        )
    }

    /// The subject of a valid, unexpired token minted for `purpose`.
    pub fn verify(config: &JWTConfig, token: &str, purpose: TokenPurpose) -> Option<String> {
        let data = jsonwebtoken::decode::<PurposeClaims>(
            token,
            &DecodingKey::from_secret(config.access_token_secret.as_ref()),
            &DECODE_HEADER,
        )
        .ok()?;
        (data.claims.purpose == purpose).then_some(data.claims.sub)
    }
}

/// Hex SHA-256 of a token; refresh tokens are stored only in this form.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
