pub mod auth;
pub mod client;
pub mod cors;
pub mod db;
pub mod jwt;
pub mod server;
pub mod tracing;
pub mod upload;

use dotenv::dotenv;
use std::{env, fmt::Display, str::FromStr};

#[derive(Clone, Default, Debug)]
pub struct ServiceConfig {
    pub db: db::DatabaseConfig,
    pub server: server::ServerConfig,
    pub jwt: jwt::JWTConfig,
    pub auth: auth::AuthConfig,
    pub upload: upload::UploadConfig,
    pub cors: cors::CorsConfig,
}

impl ServiceConfig {
    pub fn init_from_env(&mut self) -> Result<(), String> {
        dotenv().ok();
        self.db.init_from_env()?;
        self.server.init_from_env()?;
        self.jwt.init_from_env()?;
        self.auth.init_from_env()?;
        self.upload.init_from_env()?;
        self.cors.init_from_env()?;
        Ok(())
    }
}

/// Reads `key` from the environment, falling back to `default` when unset.
/// A value that is set but does not parse is an error.
pub(crate) fn var_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("{key} is not valid: {e}")),
        Err(_) => Ok(default),
    }
}

/// Reads an optional, non-blank variable.
pub(crate) fn var_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
