use std::path::PathBuf;

use super::{var_opt, var_or};

#[derive(Debug, Clone, Default)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl UploadConfig {
    pub fn init_from_env(&mut self) -> Result<(), String> {
        self.dir = PathBuf::from(var_opt("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()));
        self.max_bytes = var_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?;
        Ok(())
    }
}
