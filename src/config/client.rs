use std::{path::PathBuf, time::Duration};

use dotenv::dotenv;

use super::{var_opt, var_or};

/// Settings for the command-line API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub session_file: PathBuf,
    pub timeout: Duration,
    pub login_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            session_file: PathBuf::from(".inspectctl/session.json"),
            timeout: Duration::from_secs(30),
            login_path: "/login".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn init_from_env(&mut self) -> Result<(), String> {
        dotenv().ok();
        if let Some(base_url) = var_opt("API_BASE_URL") {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(path) = var_opt("SESSION_FILE") {
            self.session_file = PathBuf::from(path);
        }
        self.timeout = Duration::from_secs(var_or("API_TIMEOUT_SECS", 30)?);
        Ok(())
    }
}
