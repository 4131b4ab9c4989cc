use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Body, Client, Response,
};
use shared::{
    error::ErrorBody,
    protocol::{ServerInfo, StatusResponse, UploadResponse, UPLOAD_FORM_FIELD},
};
use tracing::{debug, info, warn};

use crate::{
    config::ControllerConfig,
    error::TransportError,
    source::{AudioSource, ProgressSink},
};

#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Liveness check. Any `Ok` means the backend answered with 2xx; the
    /// body is returned when it parses.
    async fn probe_status(&self) -> Result<Option<StatusResponse>, TransportError>;

    async fn upload(
        &self,
        source: AudioSource,
        progress: ProgressSink,
    ) -> Result<UploadResponse, TransportError>;

    async fn server_info(&self) -> Result<ServerInfo, TransportError>;
}

pub struct HttpBackend {
    http: Client,
    config: ControllerConfig,
}

impl HttpBackend {
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: ControllerConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

pub(crate) async fn rejection(response: Response) -> TransportError {
    let status = response.status().as_u16();
    let detail = match response.bytes().await {
        Ok(bytes) => ErrorBody::from_slice(&bytes)
            .and_then(|body| body.detail_text().map(str::to_string)),
        Err(error) => {
            debug!(status, %error, "backend: failed to read error body");
            None
        }
    };
    TransportError::Rejected { status, detail }
}

#[async_trait]
impl BackendTransport for HttpBackend {
    async fn probe_status(&self) -> Result<Option<StatusResponse>, TransportError> {
        let url = self.config.endpoint("status");
        let response = self
            .http
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        match response.json::<StatusResponse>().await {
            Ok(status) => Ok(Some(status)),
            Err(error) => {
                debug!(%url, %error, "backend: status body not understood");
                Ok(None)
            }
        }
    }

    async fn upload(
        &self,
        source: AudioSource,
        progress: ProgressSink,
    ) -> Result<UploadResponse, TransportError> {
        let url = self.config.endpoint("upload");
        let file_name = source.file_name().to_string();
        let mime = source.format().mime_type();
        let len = source.len();
        info!(%url, file = %file_name, bytes = len, "backend: uploading audio");
        if source.is_empty() {
            warn!(file = %file_name, "backend: uploading an empty file");
        }

        let part = Part::stream_with_length(Body::wrap_stream(source.into_stream(progress)), len)
            .file_name(file_name.clone())
            .mime_str(mime)
            .map_err(|error| TransportError::Body(error.to_string()))?;
        let form = Form::new().part(UPLOAD_FORM_FIELD, part);

        let mut request = self.http.post(&url).multipart(form);
        if let Some(timeout) = self.config.request_timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            let rejected = rejection(response).await;
            warn!(file = %file_name, error = ?rejected, "backend: upload rejected");
            return Err(rejected);
        }

        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<UploadResponse>(&bytes).unwrap_or_else(|error| {
            warn!(file = %file_name, %error, "backend: upload response is not JSON");
            UploadResponse::default()
        });
        info!(file = %file_name, status = ?body.status, "backend: upload answered");
        Ok(body)
    }

    async fn server_info(&self) -> Result<ServerInfo, TransportError> {
        let response = self
            .http
            .get(self.config.endpoint(""))
            .timeout(self.config.probe_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        response
            .json::<ServerInfo>()
            .await
            .map_err(|error| TransportError::Body(format!("invalid server info: {error}")))
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
