use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::session_store::SessionStoreError;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The refresh endpoint refused; credentials were cleared.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Still unauthorized after the one refresh retry.
    #[error("not authorized")]
    Unauthorized,

    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiClientError::Status { status, .. } => Some(*status),
            ApiClientError::Unauthorized | ApiClientError::SessionExpired => {
                Some(StatusCode::UNAUTHORIZED)
            }
            _ => None,
        }
    }
}

/// Human-readable message from an error body: the `detail` string, or the
/// `msg` of each entry when `detail` is a validation list.
pub fn detail_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        let body = body.trim();
        return (!body.is_empty()).then(|| body.to_string());
    };
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|loc| loc.last())
                        .and_then(Value::as_str);
                    Some(match field {
                        Some(field) => format!("{field}: {msg}"),
                        None => msg.to_string(),
                    })
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        other => Some(other.to_string()),
    }
}
