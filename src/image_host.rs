use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// A file received from a form, not yet uploaded.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UploadError {
    #[error("Please select an image file.")]
    NotAnImage,

    #[error("Image is too large ({size} bytes). The limit is 2 MB.")]
    TooLarge { size: usize },

    /// The host's own error text, shown as-is.
    #[error("{0}")]
    Provider(String),

    #[error("Image upload failed. Please try again.")]
    Transport,
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::NotAnImage | UploadError::TooLarge { .. } => StatusCode::BAD_REQUEST,
            UploadError::Provider(_) | UploadError::Transport => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Local checks done before any bytes leave the server.
pub fn check_image(image: &ImageUpload) -> Result<(), UploadError> {
    if !image.content_type.starts_with("image/") {
        return Err(UploadError::NotAnImage);
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(UploadError::TooLarge {
            size: image.bytes.len(),
        });
    }

    Ok(())
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload and return the public HTTPS URL.
    async fn upload(&self, image: &ImageUpload) -> Result<String, UploadError>;
}

pub async fn upload_checked(host: &dyn ImageHost, image: &ImageUpload) -> Result<String, UploadError> {
    check_image(image)?;
    let url = host.upload(image).await?;
    tracing::info!(%url, size = image.bytes.len(), "Uploaded image.");

    Ok(url)
}

/// ImgBB-style upload API: multipart `image` field, `key` query parameter.
pub struct ImgHost {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ImgHostResponse {
    data: Option<ImgHostData>,
    error: Option<ImgHostError>,
}

#[derive(Deserialize)]
struct ImgHostData {
    url: String,
}

#[derive(Deserialize)]
struct ImgHostError {
    message: String,
}

impl ImgHost {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        ImgHost {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ImageHost for ImgHost {
    async fn upload(&self, image: &ImageUpload) -> Result<String, UploadError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|_| UploadError::NotAnImage)?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                tracing::warn!(?error, "Image host unreachable.");
                UploadError::Transport
            })?;

        let status = response.status();
        let body: ImgHostResponse = response.json().await.map_err(|error| {
            tracing::warn!(?error, %status, "Unreadable image host response.");
            UploadError::Provider(format!("Image host returned {}", status))
        })?;

        match (status.is_success(), body.data, body.error) {
            (true, Some(data), _) => Ok(data.url),
            (_, _, Some(error)) => Err(UploadError::Provider(error.message)),
            _ => Err(UploadError::Provider(format!("Image host returned {}", status))),
        }
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Counts uploads; fails with the configured provider message if set.
    #[derive(Default)]
    pub struct FakeImageHost {
        pub uploads: AtomicUsize,
        pub fail_with: Option<String>,
    }

    #[async_trait]
    impl ImageHost for FakeImageHost {
        async fn upload(&self, image: &ImageUpload) -> Result<String, UploadError> {
            if let Some(message) = &self.fail_with {
                return Err(UploadError::Provider(message.clone()));
            }
            let n = self.uploads.fetch_add(1, Ordering::SeqCst);

            Ok(format!("https://images.example.org/{}/{}", n, image.file_name))
        }
    }
}
