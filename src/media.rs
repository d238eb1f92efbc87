use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use uuid::Uuid;

use crate::{
    constants::{IMAGE_EXTENSIONS, RECIPE_IMAGE_DIR},
    error::ApiError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

pub fn decode_data_uri(value: &str) -> Result<DecodedImage, String> {
    let (header, payload) = value
        .split_once(',')
        .ok_or_else(|| String::from("Image must be a base64 data URI."))?;

    let media_type = header
        .strip_prefix("data:image/")
        .and_then(|rest| rest.strip_suffix(";base64"))
        .ok_or_else(|| String::from("Image must be a base64 data URI."))?;

    let extension = IMAGE_EXTENSIONS
        .iter()
        .find(|(subtype, _)| subtype.eq_ignore_ascii_case(media_type))
        .map(|(_, extension)| *extension)
        .ok_or_else(|| format!("Unsupported image type `{media_type}`."))?;

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| String::from("Image payload is not valid base64."))?;

    if bytes.is_empty() {
        return Err(String::from("Image is empty."));
    }

    Ok(DecodedImage { extension, bytes })
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url: url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image and returns its path relative to the media root.
    pub async fn save_recipe_image(&self, image: &DecodedImage) -> Result<String, ApiError> {
        let relative = format!("{RECIPE_IMAGE_DIR}/{}.{}", Uuid::new_v4(), image.extension);
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ApiError::Internal(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write {}: {e}", path.display())))?;

        log::debug!("Stored recipe image {relative} ({} bytes)", image.bytes.len());
        Ok(relative)
    }

    /// Best effort: a missing file is not an error worth failing a request over.
    pub async fn remove(&self, relative: &str) {
        let path = self.root.join(relative);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            log::warn!("Failed to remove image {}: {e}", path.display());
        }
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}{relative}", self.url)
    }
}
