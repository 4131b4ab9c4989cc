use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    backend_url: String,
    pub probe_timeout: Duration,
    /// Applies to the upload request. `None` leaves the HTTP client default.
    pub request_timeout: Option<Duration>,
}

impl ControllerConfig {
    pub fn new(backend_url: &str) -> Result<Self> {
        Ok(Self {
            backend_url: normalize_backend_url(backend_url)?,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            request_timeout: None,
        })
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.backend_url, path.trim_start_matches('/'))
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            request_timeout: None,
        }
    }
}

fn normalize_backend_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("backend url must not be empty");
    }
    let parsed = Url::parse(raw).with_context(|| format!("invalid backend url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "backend url '{raw}' must use http or https, got '{}'",
            parsed.scheme()
        );
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        bail!("backend url '{raw}' must not carry a query or fragment");
    }
    Ok(raw.trim_end_matches('/').to_string())
}
