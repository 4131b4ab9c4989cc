use shared::domain::ResultArtifacts;

use crate::error::UploadError;

pub const PROBING_STATUS: &str = "Uploading file...";
pub const COMPLETED_STATUS: &str = "Processing completed";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadState {
    #[default]
    Idle,
    Probing,
    Uploading {
        progress: u8,
    },
    Succeeded(ResultArtifacts),
    Failed(UploadError),
}

impl UploadState {
    pub fn status_text(&self) -> Option<String> {
        match self {
            UploadState::Probing => Some(PROBING_STATUS.to_string()),
            UploadState::Uploading { progress } => Some(uploading_status(*progress)),
            UploadState::Succeeded(_) => Some(COMPLETED_STATUS.to_string()),
            UploadState::Idle | UploadState::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&UploadError> {
        match self {
            UploadState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn artifacts(&self) -> Option<&ResultArtifacts> {
        match self {
            UploadState::Succeeded(artifacts) => Some(artifacts),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadState::Probing | UploadState::Uploading { .. })
    }
}

pub fn uploading_status(progress: u8) -> String {
    format!("Uploading: {progress}%")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Reset,
    Status(String),
    Error(UploadError),
    Succeeded(ResultArtifacts),
}
