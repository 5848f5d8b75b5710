use super::var_opt;

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Empty means any origin, without credentials.
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn init_from_env(&mut self) -> Result<(), String> {
        self.allowed_origins = var_opt("CORS_ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();
        Ok(())
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
