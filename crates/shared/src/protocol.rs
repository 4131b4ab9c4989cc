use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::ResultArtifacts;

pub const UPLOAD_STATUS_SUCCESS: &str = "success";
pub const UPLOAD_FORM_FIELD: &str = "file";

// Every field is optional so a partial body still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<UploadData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srt_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl UploadResponse {
    pub fn success(artifacts: ResultArtifacts) -> Self {
        Self {
            status: Some(UPLOAD_STATUS_SUCCESS.to_string()),
            message: None,
            data: Some(UploadData {
                xml_url: Some(artifacts.xml_url),
                srt_url: Some(artifacts.srt_url),
                audio_url: Some(artifacts.audio_url),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(UPLOAD_STATUS_SUCCESS)
    }

    pub fn into_artifacts(self) -> Option<ResultArtifacts> {
        if !self.is_success() {
            return None;
        }
        let data = self.data?;
        Some(ResultArtifacts {
            xml_url: data.xml_url?,
            srt_url: data.srt_url?,
            audio_url: data.audio_url?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_directory_exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
    #[serde(default)]
    pub supported_formats: Vec<String>,
}
