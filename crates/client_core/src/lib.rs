//! Client side of the audio processing service: selects an audio file,
//! uploads it to the backend and maps the answer to result artifacts.

pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod source;
pub mod state;
pub mod transport;

pub use config::ControllerConfig;
pub use controller::UploadController;
pub use download::{ArtifactDownloader, DownloadError, DownloadedArtifact};
pub use error::{ErrorCategory, TransportError, UploadError};
pub use source::{AudioSource, ProgressSink, SourceReadError};
pub use state::{UploadEvent, UploadState};
pub use transport::{BackendTransport, HttpBackend};
