use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("not a base64 data URL")]
    NotDataUrl,

    #[error("unsupported file extension '{0}'")]
    BadExtension(String),

    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to store media: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded `data:<mime>;base64,<payload>` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// The extension is the last `/` segment of the mime part, so
/// `data:image/jpeg;base64,...` is stored as `.jpeg`.
pub fn parse_data_url(value: &str) -> Result<DataUrl, MediaError> {
    let (format, payload) = value
        .split_once(";base64,")
        .ok_or(MediaError::NotDataUrl)?;
    let extension = format.rsplit('/').next().unwrap_or_default();

    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(MediaError::BadExtension(extension.to_string()));
    }

    Ok(DataUrl {
        extension: extension.to_ascii_lowercase(),
        bytes: STANDARD.decode(payload.trim())?,
    })
}

/// 32 lowercase hex characters.
pub fn random_name() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Files stored below the media root and served under the media URL.
#[derive(Clone, Debug)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url: url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, relative: &str) -> String {
        format!("{}{}", self.url, relative)
    }

    /// Stores an ad-hoc upload under `obs/` and returns its public URL.
    pub async fn save_upload(&self, data_url: &str) -> Result<String, MediaError> {
        let data = parse_data_url(data_url)?;
        let relative = self.write("obs", &data).await?;
        Ok(self.url_for(&relative))
    }

    /// Stores a photo under `uploads/YYYY/MM/DD/` and returns the path
    /// relative to the media root.
    pub async fn save_photo(&self, data_url: &str, now: DateTime<Utc>) -> Result<String, MediaError> {
        let data = parse_data_url(data_url)?;
        let dir = now.format("uploads/%Y/%m/%d").to_string();
        self.write(&dir, &data).await
    }

    async fn write(&self, dir: &str, data: &DataUrl) -> Result<String, MediaError> {
        let relative = format!("{}/{}.{}", dir, random_name(), data.extension);
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data.bytes).await?;
        tracing::debug!("stored {} bytes at {}", data.bytes.len(), path.display());
        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_data_urls() {
        let data = parse_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(data.extension, "png");
        assert_eq!(data.bytes, b"hello");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse_data_url("aGVsbG8="), Err(MediaError::NotDataUrl)));
        assert!(matches!(
            parse_data_url("data:image/svg+xml;base64,aGVsbG8="),
            Err(MediaError::BadExtension(_))
        ));
        assert!(matches!(
            parse_data_url("data:image/png;base64,***"),
            Err(MediaError::Decode(_))
        ));
    }

    #[test]
    fn random_names_are_hex() {
        let name = random_name();
        assert_eq!(name.len(), 32);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn stores_uploads_and_photos() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media/");

        let url = storage
            .save_upload("data:image/jpeg;base64,aGVsbG8=")
            .await
            .unwrap();
        assert!(url.starts_with("/media/obs/"));
        assert!(url.ends_with(".jpeg"));
        let stored = dir.path().join(url.trim_start_matches("/media/"));
        assert_eq!(std::fs::read(stored).unwrap(), b"hello");

        let now = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        let relative = storage
            .save_photo("data:image/png;base64,aGVsbG8=", now)
            .await
            .unwrap();
        assert!(relative.starts_with("uploads/2024/03/07/"));
        assert!(dir.path().join(&relative).exists());
    }
}
