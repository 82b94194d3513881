//! Local storage for uploaded regulation documents.
//!
//! Uploads are written under a configured directory with a timestamped object
//! key; the key is what gets handed to the analysis service.

use std::path::PathBuf;

use chrono::Utc;

use crate::errors::AppError;

/// Store for uploaded source documents.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Persist an upload and return its object key.
    pub async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let key = format!(
            "{}_{}",
            Utc::now().format("%Y-%m-%d_%H:%M:%S%.3f"),
            sanitize(file_name)
        );
        tokio::fs::write(self.dir.join(&key), bytes).await?;

        tracing::debug!("Stored upload {} ({} bytes)", key, bytes.len());
        Ok(key)
    }
}

/// Strip path components so a crafted filename cannot escape the upload dir.
fn sanitize(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    if base.is_empty() {
        "upload.pdf".to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_path_components() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("C:\\docs\\reg.pdf"), "reg.pdf");
        assert_eq!(sanitize("plain.pdf"), "plain.pdf");
        assert_eq!(sanitize("  "), "upload.pdf");
    }

    #[tokio::test]
    async fn test_store_writes_file_with_key() {
        let temp = tempfile::tempdir().unwrap();
        let store = UploadStore::new(temp.path().to_path_buf());

        let key = store.store("reg.pdf", b"%PDF-1.4 test").await.unwrap();
        assert!(key.ends_with("_reg.pdf"));

        let written = tokio::fs::read(temp.path().join(&key)).await.unwrap();
        assert_eq!(written, b"%PDF-1.4 test");
    }
}
