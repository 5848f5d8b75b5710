use std::env;

use super::var_or;

/// Upper bound for any token lifetime: ten years.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default)]
pub struct JWTConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    /// Lifetimes in seconds.
    pub refresh_token_expired_date: u64,
    pub access_token_expired_date: u64,
    pub reset_token_expired_date: u64,
    pub verify_token_expired_date: u64,
}

impl JWTConfig {
    pub fn init_from_env(&mut self) -> Result<(), String> {
        self.access_token_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET not set in environment".to_string())?;

        self.refresh_token_secret = env::var("JWT_REFRESH_SECRET")
            .map_err(|_| "JWT_REFRESH_SECRET not set in environment".to_string())?;

        if self.access_token_secret == self.refresh_token_secret {
            return Err("JWT_SECRET and JWT_REFRESH_SECRET must differ".to_string());
        }

        self.access_token_expired_date = var_or("JWT_ACCESS_TOKEN_EXPIRED_DATE", 30 * 60)?;
        self.refresh_token_expired_date =
            var_or("JWT_REFRESH_TOKEN_EXPIRED_DATE", 7 * 24 * 60 * 60)?;
        self.reset_token_expired_date = var_or("JWT_RESET_TOKEN_EXPIRED_DATE", 30 * 60)?;
        self.verify_token_expired_date = var_or("JWT_VERIFY_TOKEN_EXPIRED_DATE", 24 * 60 * 60)?;

        self.validate()
    }

    /// Every lifetime must be positive and at most [`MAX_TOKEN_LIFETIME_SECS`].
    pub fn validate(&self) -> Result<(), String> {
        for (key, seconds) in [
            ("JWT_ACCESS_TOKEN_EXPIRED_DATE", self.access_token_expired_date),
            ("JWT_REFRESH_TOKEN_EXPIRED_DATE", self.refresh_token_expired_date),
            ("JWT_RESET_TOKEN_EXPIRED_DATE", self.reset_token_expired_date),
            ("JWT_VERIFY_TOKEN_EXPIRED_DATE", self.verify_token_expired_date),
        ] {
            if seconds == 0 || seconds > MAX_TOKEN_LIFETIME_SECS {
                return Err(format!(
                    "{key} must be between 1 and {MAX_TOKEN_LIFETIME_SECS} seconds, got {seconds}"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JWTConfig {
        JWTConfig {
            access_token_secret: "a".to_string(),
            refresh_token_secret: "b".to_string(),
            refresh_token_expired_date: 7 * 24 * 60 * 60,
            access_token_expired_date: 30 * 60,
            reset_token_expired_date: 30 * 60,
            verify_token_expired_date: 24 * 60 * 60,
        }
    }

    #[test]
    fn default_lifetimes_pass_validation() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn out_of_range_lifetimes_are_rejected() {
        let mut huge = config();
        huge.refresh_token_expired_date = u64::MAX;
        let err = huge.validate().unwrap_err();
        assert!(err.starts_with("JWT_REFRESH_TOKEN_EXPIRED_DATE"), "{err}");

        let mut over = config();
        over.access_token_expired_date = MAX_TOKEN_LIFETIME_SECS + 1;
        assert!(over.validate().is_err());

        let mut zero = config();
        zero.verify_token_expired_date = 0;
        assert!(zero.validate().is_err());

        let mut edge = config();
        edge.reset_token_expired_date = MAX_TOKEN_LIFETIME_SECS;
        assert!(edge.validate().is_ok());
    }
}
