use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

const CACHE_DIR_NAME: &str = "climascope";

/// The per-user cache directory, e.g. `~/.cache/climascope` on Linux.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cache path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Makes a user-supplied value safe for use in an export filename:
/// whitespace becomes underscores, path-hostile characters are dropped.
pub fn sanitize_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}
