use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::AudioFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported file type for '{file_name}'; please use: {accepted}")]
pub struct UnsupportedFileType {
    pub file_name: String,
    pub accepted: String,
}

impl UnsupportedFileType {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            accepted: AudioFormat::accepted_list(),
        }
    }
}

/// Error body the backend sends with non-2xx responses.
///
/// `detail` is usually a string, but request validation failures report a
/// list of objects instead, so it is kept loosely typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    pub fn detail_text(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(Value::as_str)
            .filter(|detail| !detail.is_empty())
    }
}
