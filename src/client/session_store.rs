//! Where the API client keeps its credentials between calls. One trait, one
//! owner: the request wrapper writes on login and refresh and clears on
//! refresh failure or logout.

use std::{
    io,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("cannot access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The persisted keys. `refresh_token` mirrors the HttpOnly cookie so a
/// native client survives restarts; it is never sent as a bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

pub trait SessionStore: Send + Sync {
    fn snapshot(&self) -> Credentials;

    fn update(&self, apply: &dyn Fn(&mut Credentials)) -> Result<(), SessionStoreError>;

    fn clear(&self) -> Result<(), SessionStoreError>;

    fn access_token(&self) -> Option<String> {
        self.snapshot().token
    }

    fn set_access_token(&self, token: &str) -> Result<(), SessionStoreError> {
        self.update(&|c| c.token = Some(token.to_string()))
    }

    fn role(&self) -> Option<String> {
        self.snapshot().role
    }

    fn set_role(&self, role: &str) -> Result<(), SessionStoreError> {
        self.update(&|c| c.role = Some(role.to_string()))
    }

    fn refresh_cookie(&self) -> Option<String> {
        self.snapshot().refresh_token
    }

    fn set_refresh_cookie(&self, value: Option<&str>) -> Result<(), SessionStoreError> {
        self.update(&|c| c.refresh_token = value.map(str::to_string))
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    credentials: RwLock<Credentials>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn snapshot(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: &dyn Fn(&mut Credentials)) -> Result<(), SessionStoreError> {
        apply(&mut self.credentials.write().unwrap_or_else(PoisonError::into_inner));
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.credentials.write().unwrap_or_else(PoisonError::into_inner) = Credentials::default();
        Ok(())
    }
}

/// JSON key-value file, rewritten on every change and removed on clear.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    credentials: RwLock<Credentials>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        let credentials = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                SessionStoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Credentials::default(),
            Err(source) => return Err(SessionStoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            credentials: RwLock::new(credentials),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, credentials: &Credentials) -> Result<(), SessionStoreError> {
        let io_error = |source| SessionStoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let bytes = serde_json::to_vec_pretty(credentials).map_err(|source| {
            SessionStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, bytes).map_err(io_error)?;
        debug!("Session written to {}", self.path.display());
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn snapshot(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: &dyn Fn(&mut Credentials)) -> Result<(), SessionStoreError> {
        let mut guard = self.credentials.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard);
        self.persist(&guard)
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.credentials.write().unwrap_or_else(PoisonError::into_inner) = Credentials::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
