use std::error::Error as _;

use shared::error::UnsupportedFileType;
use thiserror::Error;

use crate::source::SourceReadError;

pub const NO_FILE_SELECTED_MESSAGE: &str = "Please select a file first";
pub const SERVER_UNREACHABLE_MESSAGE: &str =
    "Cannot reach the server. Please verify that the server is running.";
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Connection error with the server. Verify that the server is running.";
pub const PROCESSING_FAILED_MESSAGE: &str = "Error while processing the file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Connectivity,
    Transport,
    Processing,
    Control,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error(transparent)]
    UnsupportedFileType(#[from] UnsupportedFileType),
    #[error("{}", NO_FILE_SELECTED_MESSAGE)]
    NoFileSelected,
    #[error("cannot read '{file_name}': {reason}")]
    FileUnreadable { file_name: String, reason: String },
    #[error("{}", SERVER_UNREACHABLE_MESSAGE)]
    ServerUnreachable,
    #[error("Error: {0}")]
    Transport(String),
    #[error("{}", PROCESSING_FAILED_MESSAGE)]
    Processing,
    #[error("an upload is already in progress")]
    Busy,
    #[error("upload cancelled")]
    Cancelled,
}

impl UploadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            UploadError::UnsupportedFileType(_)
            | UploadError::NoFileSelected
            | UploadError::FileUnreadable { .. } => ErrorCategory::Validation,
            UploadError::ServerUnreachable => ErrorCategory::Connectivity,
            UploadError::Transport(_) => ErrorCategory::Transport,
            UploadError::Processing => ErrorCategory::Processing,
            UploadError::Busy | UploadError::Cancelled => ErrorCategory::Control,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Unreachable(String),
    #[error("request timed out")]
    Timeout,
    #[error("server responded with status {status}")]
    Rejected { status: u16, detail: Option<String> },
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Body(String),
}

impl TransportError {
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            TransportError::Unreachable(_) => CONNECTION_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let local = std::iter::successors(error.source(), |cause: &&(dyn std::error::Error + 'static)| (*cause).source())
            .find_map(|cause| cause.downcast_ref::<SourceReadError>());
        if let Some(local) = local {
            TransportError::Io(local.to_string())
        } else if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() || error.is_request() {
            TransportError::Unreachable(error.to_string())
        } else if let Some(status) = error.status() {
            TransportError::Rejected {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            TransportError::Body(error.to_string())
        }
    }
}

impl From<TransportError> for UploadError {
    fn from(error: TransportError) -> Self {
        UploadError::Transport(error.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_wins_over_generic_messages() {
        let error = TransportError::Rejected {
            status: 500,
            detail: Some("Error en el procesamiento del audio: boom".into()),
        };
        assert_eq!(
            UploadError::from(error).to_string(),
            "Error: Error en el procesamiento del audio: boom"
        );
    }

    #[test]
    fn network_failures_use_connection_message() {
        let error = TransportError::Unreachable("tcp connect error".into());
        assert_eq!(error.user_message(), CONNECTION_ERROR_MESSAGE);
    }

    #[test]
    fn other_failures_use_raw_text() {
        let error = TransportError::Rejected {
            status: 502,
            detail: None,
        };
        assert_eq!(error.user_message(), "server responded with status 502");
        assert_eq!(TransportError::Timeout.user_message(), "request timed out");
        assert_eq!(
            TransportError::Io("failed to read 'a.wav': file ended after 10 of 20 bytes".into())
                .user_message(),
            "failed to read 'a.wav': file ended after 10 of 20 bytes"
        );
    }

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(UploadError::NoFileSelected.category(), ErrorCategory::Validation);
        assert_eq!(
            UploadError::ServerUnreachable.category(),
            ErrorCategory::Connectivity
        );
        assert_eq!(
            UploadError::Transport("x".into()).category(),
            ErrorCategory::Transport
        );
        assert_eq!(UploadError::Processing.category(), ErrorCategory::Processing);
        assert_eq!(UploadError::Busy.category(), ErrorCategory::Control);
    }
}
