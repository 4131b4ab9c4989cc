use std::{
    io,
    path::{Path, PathBuf},
};

use futures::StreamExt;
use reqwest::Client;
use shared::domain::{ArtifactKind, ResultArtifacts};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::info;
use url::Url;

use crate::{error::TransportError, transport::rejection};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid {kind} url '{url}': {reason}")]
    InvalidUrl {
        kind: &'static str,
        url: String,
        reason: String,
    },
    #[error("download of {kind} failed: {}", .source.user_message())]
    Transport {
        kind: &'static str,
        #[source]
        source: TransportError,
    },
    #[error("failed to write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub bytes: u64,
}

pub fn artifact_file_name(kind: ArtifactKind, url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        .filter(|segment| *segment != "." && *segment != ".." && !segment.contains('\\'))
        .map(str::to_string)
        .unwrap_or_else(|| kind.fallback_file_name().to_string())
}

pub struct ArtifactDownloader {
    http: Client,
}

impl Default for ArtifactDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactDownloader {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    pub async fn download_all(
        &self,
        artifacts: &ResultArtifacts,
        dest_dir: &Path,
    ) -> Result<Vec<DownloadedArtifact>, DownloadError> {
        fs::create_dir_all(dest_dir)
            .await
            .map_err(|source| DownloadError::Io {
                path: dest_dir.to_path_buf(),
                source,
            })?;

        let mut downloaded = Vec::with_capacity(3);
        for (kind, url) in artifacts.iter() {
            downloaded.push(self.download(kind, url, dest_dir).await?);
        }
        Ok(downloaded)
    }

    pub async fn download(
        &self,
        kind: ArtifactKind,
        url: &str,
        dest_dir: &Path,
    ) -> Result<DownloadedArtifact, DownloadError> {
        let parsed = Url::parse(url).map_err(|error| DownloadError::InvalidUrl {
            kind: kind.label(),
            url: url.to_string(),
            reason: error.to_string(),
        })?;
        let transport = |source: TransportError| DownloadError::Transport {
            kind: kind.label(),
            source,
        };

        let response = self
            .http
            .get(parsed.clone())
            .send()
            .await
            .map_err(|error| transport(error.into()))?;
        if !response.status().is_success() {
            return Err(transport(rejection(response).await));
        }

        let path = dest_dir.join(artifact_file_name(kind, &parsed));
        let io_error = |source: io::Error| DownloadError::Io {
            path: path.clone(),
            source,
        };
        let mut file = fs::File::create(&path).await.map_err(io_error)?;
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|error| transport(error.into()))?;
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_error)?;

        info!(kind = kind.label(), path = %path.display(), bytes = written, "download: artifact saved");
        Ok(DownloadedArtifact {
            kind,
            path,
            bytes: written,
        })
    }
}

#[cfg(test)]
#[path = "tests/download_tests.rs"]
mod tests;
