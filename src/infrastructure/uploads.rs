use crate::domain::repository::{PhotoStore, UploadedPhoto};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use uuid::Uuid;

pub const NOT_AN_IMAGE: &str = "Not an image! Please upload an image.";

pub fn is_image(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

/// Extension taken from the client file name when it is plain alphanumeric,
/// otherwise from the MIME subtype.
fn extension_for(photo: &UploadedPhoto) -> String {
    let from_name = photo
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match from_name {
        Some(ext) => ext.to_ascii_lowercase(),
        None => photo
            .content_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .unwrap_or("bin")
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect(),
    }
}

/// Writes photos under a root directory as `<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct DiskPhotoStore {
    root: PathBuf,
}

impl DiskPhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PhotoStore for DiskPhotoStore {
    #[instrument(skip(self, photo), fields(content_type = %photo.content_type, size = photo.bytes.len()))]
    async fn store(&self, photo: UploadedPhoto) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating upload directory {}", self.root.display()))?;

        let path = self
            .root
            .join(format!("{}.{}", Uuid::new_v4(), extension_for(&photo)));
        tokio::fs::write(&path, &photo.bytes)
            .await
            .with_context(|| format!("writing upload {}", path.display()))?;

        debug!(path = %path.display(), "Photo stored");
        Ok(path.to_string_lossy().into_owned())
    }

    #[instrument(skip(self))]
    async fn remove(&self, path: &str) -> Result<()> {
        let path = Path::new(path);
        if !path.starts_with(&self.root) {
            anyhow::bail!("refusing to remove {} outside the upload directory", path.display());
        }
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("removing upload {}", path.display()))?;
        debug!(path = %path.display(), "Photo removed");
        Ok(())
    }
}
