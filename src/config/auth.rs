use super::{var_opt, var_or};

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Marks the refresh cookie `Secure`. Only disable for plain-http development.
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub bootstrap_admin_username: Option<String>,
    pub bootstrap_admin_password: Option<String>,
    /// Base used to build the links sent in verification mails.
    pub public_base_url: String,
}

impl AuthConfig {
    pub fn init_from_env(&mut self) -> Result<(), String> {
        self.cookie_secure = var_or("COOKIE_SECURE", true)?;
        self.bcrypt_cost = var_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err("BCRYPT_COST must be between 4 and 31".to_string());
        }
        self.bootstrap_admin_username = var_opt("BOOTSTRAP_ADMIN_USERNAME");
        self.bootstrap_admin_password = var_opt("BOOTSTRAP_ADMIN_PASSWORD");
        if self.bootstrap_admin_username.is_some() != self.bootstrap_admin_password.is_some() {
            return Err(
                "BOOTSTRAP_ADMIN_USERNAME and BOOTSTRAP_ADMIN_PASSWORD must be set together"
                    .to_string(),
            );
        }
        self.public_base_url = var_opt("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(())
    }
}
