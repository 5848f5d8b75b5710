//! Refresh sessions. Each login opens one server-side row named by the
//! token's `sid`; the refresh token itself is stored only as a hash and is
//! rotated on every use.

use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::ConnectionTrait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::jwt::{JWTConfig, MAX_TOKEN_LIFETIME_SECS},
    entity::user,
    error::{AppError, AppResult},
    repositories,
    utils::jwt::{self, hash_token, UserClaims},
};

/// How long the token a rotation replaced may still arrive without being
/// treated as a replay.
pub const ROTATION_GRACE_SECS: i64 = 30;

#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub enum Rotation {
    Rotated {
        user: user::Model,
        tokens: IssuedTokens,
    },
    /// A concurrent request already rotated this token. The session stays
    /// live under the token that request received.
    Superseded,
}

fn rejected() -> AppError {
    AppError::Unauthorized("Invalid refresh token".to_string())
}

fn encode_failure(e: jsonwebtoken::errors::Error) -> AppError {
    AppError::Internal(format!("failed to encode token: {e}"))
}

fn refresh_expiry(config: &JWTConfig) -> DateTime<Utc> {
    let seconds = config.refresh_token_expired_date.min(MAX_TOKEN_LIFETIME_SECS);
    i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn within_grace(rotated_at: Option<DateTime<Utc>>) -> bool {
    rotated_at.is_some_and(|at| Utc::now() - at <= TimeDelta::seconds(ROTATION_GRACE_SECS))
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn open_session<C: ConnectionTrait>(
    db: &C,
    config: &JWTConfig,
    user: &user::Model,
) -> AppResult<IssuedTokens> {
    let sid = Uuid::new_v4();
    let (access_token, refresh_token) =
        jwt::generate_token_pair(config, user, sid).map_err(encode_failure)?;
    repositories::refresh_session::save(
        db,
        sid,
        user.id,
        hash_token(&refresh_token),
        refresh_expiry(config),
    )
    .await?;
    info!("Opened refresh session {}", sid);
    Ok(IssuedTokens {
        access_token,
        refresh_token,
    })
}

/// Exchanges a refresh token for a new pair. The token a rotation just
/// replaced yields [`Rotation::Superseded`] for [`ROTATION_GRACE_SECS`];
/// any other stale token revokes the whole session.
#[tracing::instrument(skip_all)]
pub async fn rotate<C: ConnectionTrait>(
    db: &C,
    config: &JWTConfig,
    refresh_token: &str,
) -> AppResult<Rotation> {
    let claims = UserClaims::decode(refresh_token, &config.refresh_token_secret)
        .map_err(|e| {
            warn!("Refresh token rejected: {}", e);
            rejected()
        })?
        .claims;

    let session = repositories::refresh_session::find_by_id(db, claims.sid)
        .await?
        .ok_or_else(rejected)?;
    if session.revoked || session.expires_at <= Utc::now() || session.user_id != claims.uid {
        warn!("Refresh session {} is no longer usable", session.id);
        return Err(rejected());
    }
    let presented = hash_token(refresh_token);
    if session.token_hash != presented {
        if session.previous_hash.as_deref() == Some(presented.as_str())
            && within_grace(session.rotated_at)
        {
            info!("Refresh session {} was rotated by a concurrent request", session.id);
            return Ok(Rotation::Superseded);
        }
        warn!("Refresh token reuse on session {}; revoking", session.id);
        repositories::refresh_session::revoke(db, session.id).await?;
        return Err(rejected());
    }

    let user = repositories::user::find_by_id(db, claims.uid)
        .await?
        .ok_or_else(rejected)?;
    let (access_token, new_refresh) =
        jwt::generate_token_pair(config, &user, session.id).map_err(encode_failure)?;
    let swapped = repositories::refresh_session::rotate(
        db,
        session.id,
        &presented,
        hash_token(&new_refresh),
        refresh_expiry(config),
    )
    .await?;
    if !swapped {
        info!("Refresh session {} was rotated by a concurrent request", session.id);
        return Ok(Rotation::Superseded);
    }

    Ok(Rotation::Rotated {
        user,
        tokens: IssuedTokens {
            access_token,
            refresh_token: new_refresh,
        },
    })
}

/// Revokes the session behind a refresh token. Undecodable tokens are ignored.
#[tracing::instrument(skip_all)]
pub async fn revoke<C: ConnectionTrait>(
    db: &C,
    config: &JWTConfig,
    refresh_token: &str,
) -> AppResult<bool> {
    let Ok(data) = UserClaims::decode(refresh_token, &config.refresh_token_secret) else {
        return Ok(false);
    };
    let revoked = repositories::refresh_session::revoke(db, data.claims.sid).await?;
    Ok(revoked > 0)
}

pub async fn revoke_all<C: ConnectionTrait>(db: &C, user_id: i32) -> AppResult<u64> {
    let count = repositories::refresh_session::revoke_all_for_user(db, user_id).await?;
    if count > 0 {
        info!("Revoked {} refresh session(s) of user {}", count, user_id);
    }
    Ok(count)
}
