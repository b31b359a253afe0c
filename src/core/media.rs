//! Hosting for uploaded intro audio

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{MediaConfig, MediaProvider};

/// Where an uploaded file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Public URL clients stream from
    pub url: String,
    /// Opaque handle for `MediaHost::release`
    pub media_id: String,
}

/// An audio file received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn is_audio(&self) -> bool {
        self.content_type.starts_with("audio/")
    }
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Store the file and return where it can be fetched from
    async fn upload(&self, upload: &Upload) -> Result<MediaAsset>;

    /// Remove a previously uploaded file
    async fn release(&self, media_id: &str) -> Result<()>;
}

/// Build the configured host
pub fn from_config(config: &MediaConfig, media_dir: &Path) -> Arc<dyn MediaHost> {
    match config.provider {
        MediaProvider::Cloudinary => {
            info!("Hosting uploads on Cloudinary ({})", config.cloud_name);
            Arc::new(CloudinaryHost::new(
                config.cloud_name.clone(),
                config.api_key.clone(),
                config.api_secret.clone(),
            ))
        }
        MediaProvider::Local => {
            info!("Hosting uploads locally in {:?}", media_dir);
            Arc::new(LocalMediaHost::new(media_dir.to_path_buf(), "/media"))
        }
    }
}

// ========== Cloudinary ==========

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryHost {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
    resource_type: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryDestroyResponse {
    result: String,
}

impl CloudinaryHost {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            CLOUDINARY_API, self.cloud_name, resource_type, action
        )
    }
}

/// Cloudinary request signature: sha1 over the sorted `k=v` pairs joined by
/// `&`, with the api secret appended
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Handles are stored as `resource_type:public_id`
fn split_media_id(media_id: &str) -> (&str, &str) {
    media_id.split_once(':').unwrap_or(("video", media_id))
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, upload: &Upload) -> Result<MediaAsset> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(&[("timestamp", &timestamp)], &self.api_secret);

        let part = reqwest::multipart::Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await
            .context("Cloudinary upload request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Cloudinary upload returned {}: {}", status, body);
        }

        let body: CloudinaryUploadResponse = response
            .json()
            .await
            .context("Invalid Cloudinary upload response")?;

        Ok(MediaAsset {
            url: body.secure_url,
            media_id: format!("{}:{}", body.resource_type, body.public_id),
        })
    }

    async fn release(&self, media_id: &str) -> Result<()> {
        let (resource_type, public_id) = split_media_id(media_id);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let params = [
            ("public_id", public_id),
            ("api_key", self.api_key.as_str()),
            ("timestamp", timestamp.as_str()),
            ("signature", signature.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint(resource_type, "destroy"))
            .form(&params)
            .send()
            .await
            .context("Cloudinary destroy request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Cloudinary destroy returned {}", response.status());
        }

        let body: CloudinaryDestroyResponse = response.json().await?;
        debug!("Cloudinary destroy {}: {}", public_id, body.result);

        Ok(())
    }
}

// ========== Local disk ==========

/// Stores uploads on disk; the server exposes the directory under `url_prefix`
pub struct LocalMediaHost {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalMediaHost {
    pub fn new(dir: PathBuf, url_prefix: &str) -> Self {
        Self {
            dir,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }
}

/// Keep only characters that are safe in a file name
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "audio".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl MediaHost for LocalMediaHost {
    async fn upload(&self, upload: &Upload) -> Result<MediaAsset> {
        let stored = format!(
            "{}-{}",
            uuid::Uuid::new_v4().simple(),
            sanitize_filename(&upload.filename)
        );
        let path = self.dir.join(&stored);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &upload.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(MediaAsset {
            url: format!("{}/{}", self.url_prefix, stored),
            media_id: stored,
        })
    }

    async fn release(&self, media_id: &str) -> Result<()> {
        // handles are bare file names; refuse anything that could escape the dir
        if media_id.contains(['/', '\\']) || media_id.starts_with('.') {
            anyhow::bail!("Invalid media id '{}'", media_id);
        }

        let path = self.dir.join(media_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn upload(name: &str) -> Upload {
        Upload {
            filename: name.to_string(),
            content_type: "audio/mpeg".to_string(),
            bytes: Bytes::from_static(b"ID3fake"),
        }
    }

    #[test]
    fn test_sign_params_sorts_keys() {
        // reference value from Cloudinary's signing documentation
        let signature = sign_params(
            &[
                ("timestamp", "1315060510"),
                ("public_id", "sample_image"),
                ("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop"),
            ],
            "abcd",
        );
        assert_eq!(signature, "bfd09f95f331f558cbd1320e67aa8d488770583e");
    }

    #[test]
    fn test_split_media_id() {
        assert_eq!(split_media_id("video:songs/h1"), ("video", "songs/h1"));
        assert_eq!(split_media_id("legacy"), ("video", "legacy"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my song (live).mp3"), "my_song__live_.mp3");
        assert_eq!(sanitize_filename(".."), "audio");
    }

    #[test]
    fn test_is_audio() {
        assert!(upload("a.mp3").is_audio());
        let mut image = upload("a.png");
        image.content_type = "image/png".to_string();
        assert!(!image.is_audio());
    }

    #[tokio::test]
    async fn test_local_upload_and_release() {
        let dir = TempDir::new().unwrap();
        let host = LocalMediaHost::new(dir.path().to_path_buf(), "/media/");

        let asset = host.upload(&upload("intro.mp3")).await.unwrap();
        assert!(asset.url.starts_with("/media/"));
        assert!(asset.url.ends_with("-intro.mp3"));

        let stored = dir.path().join(&asset.media_id);
        assert_eq!(std::fs::read(&stored).unwrap(), b"ID3fake");

        host.release(&asset.media_id).await.unwrap();
        assert!(!stored.exists());

        // releasing twice is harmless
        host.release(&asset.media_id).await.unwrap();
        assert!(host.release("../settings.json").await.is_err());
    }
}
