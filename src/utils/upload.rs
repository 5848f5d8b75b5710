use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;

pub const UPLOAD_ROUTE: &str = "/uploads";

/// Keeps a short alphanumeric extension from the client's file name.
fn extension(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
    (!ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(ext)
}

/// Stored names are generated; nothing from the client reaches the path
/// except a sanitized extension.
pub fn stored_name(file_name: Option<&str>) -> String {
    match extension(file_name) {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    }
}

/// Writes the image and returns the URL it is served under.
pub async fn save_image(
    dir: &Path,
    file_name: Option<&str>,
    bytes: &[u8],
) -> Result<String, AppError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("cannot create upload dir: {e}")))?;
    let name = stored_name(file_name);
    tokio::fs::write(dir.join(&name), bytes)
        .await
        .map_err(|e| AppError::Internal(format!("cannot store upload: {e}")))?;
    info!("Stored inspection image {} ({} bytes)", name, bytes.len());
    Ok(format!("{UPLOAD_ROUTE}/{name}"))
}

fn local_path(dir: &Path, url: &str) -> Option<PathBuf> {
    let name = url.strip_prefix(UPLOAD_ROUTE)?.strip_prefix('/')?;
    (!name.is_empty() && !name.contains(['/', '\\']) && !name.starts_with('.'))
        .then(|| dir.join(name))
}

/// Best effort; a missing file is not an error.
pub async fn remove_image(dir: &Path, url: &str) {
    let Some(path) = local_path(dir, url) else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
