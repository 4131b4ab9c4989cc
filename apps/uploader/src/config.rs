use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use client_core::{config::DEFAULT_BACKEND_URL, ControllerConfig};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "uploader.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub probe_timeout_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            probe_timeout_secs: 10,
            request_timeout_secs: None,
            output_dir: None,
        }
    }
}

impl Settings {
    pub fn controller_config(&self) -> Result<ControllerConfig> {
        Ok(ControllerConfig::new(&self.backend_url)?
            .with_probe_timeout(Duration::from_secs(self.probe_timeout_secs))
            .with_request_timeout(self.request_timeout_secs.map(Duration::from_secs)))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    backend_url: Option<String>,
    probe_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    output_dir: Option<PathBuf>,
}

/// Defaults, then `uploader.toml` (or `path`), then environment.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let required = path.is_some();
    let path = path.unwrap_or_else(|| Path::new(SETTINGS_FILE));
    load_settings_from(path, required, |key| std::env::var(key).ok())
}

fn load_settings_from(
    path: &Path,
    required: bool,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid settings file '{}'", path.display()))?;
            if let Some(v) = file_cfg.backend_url {
                settings.backend_url = v;
            }
            if let Some(v) = file_cfg.probe_timeout_secs {
                settings.probe_timeout_secs = v;
            }
            if file_cfg.request_timeout_secs.is_some() {
                settings.request_timeout_secs = file_cfg.request_timeout_secs;
            }
            if file_cfg.output_dir.is_some() {
                settings.output_dir = file_cfg.output_dir;
            }
        }
        Err(error) if required => {
            return Err(error)
                .with_context(|| format!("failed to read settings file '{}'", path.display()));
        }
        Err(_) => {}
    }

    if let Some(v) = env("BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = env("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = env("APP__PROBE_TIMEOUT_SECS") {
        settings.probe_timeout_secs = v
            .parse()
            .with_context(|| format!("APP__PROBE_TIMEOUT_SECS must be an integer, got '{v}'"))?;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = Some(
            v.parse()
                .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS must be an integer, got '{v}'"))?,
        );
    }

    if let Some(v) = env("APP__OUTPUT_DIR") {
        settings.output_dir = Some(PathBuf::from(v));
    }

    Ok(settings)
}
