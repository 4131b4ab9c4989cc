use std::{io, sync::Arc};

use futures::{stream, Stream};
use shared::domain::{AudioFormat, SelectedFile, UploadProgress};
use thiserror::Error;
use tokio::{fs::File, io::AsyncReadExt};

use crate::error::UploadError;

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Receives byte counts as the request body is handed to the HTTP client.
pub type ProgressSink = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Local read failure while the file is being streamed to the backend.
#[derive(Debug, Error)]
#[error("failed to read '{file_name}': {source}")]
pub struct SourceReadError {
    pub file_name: String,
    #[source]
    pub source: io::Error,
}

pub struct AudioSource {
    file_name: String,
    format: AudioFormat,
    len: u64,
    file: File,
}

impl AudioSource {
    pub async fn open(selected: &SelectedFile) -> Result<Self, UploadError> {
        let unreadable = |error: io::Error| UploadError::FileUnreadable {
            file_name: selected.file_name().to_string(),
            reason: error.to_string(),
        };
        let file = File::open(selected.path()).await.map_err(unreadable)?;
        let metadata = file.metadata().await.map_err(unreadable)?;
        if !metadata.is_file() {
            return Err(UploadError::FileUnreadable {
                file_name: selected.file_name().to_string(),
                reason: "not a regular file".to_string(),
            });
        }

        Ok(Self {
            file_name: selected.file_name().to_string(),
            format: selected.format(),
            len: metadata.len(),
            file,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `progress` fires once per chunk before it is yielded, so the last
    /// call carries `loaded == total`. A file that shrinks below the length
    /// seen at open time ends the stream with an error.
    pub fn into_stream(
        self,
        progress: ProgressSink,
    ) -> impl Stream<Item = Result<Vec<u8>, SourceReadError>> + Send + 'static {
        let reader = ChunkReader {
            file: self.file,
            file_name: self.file_name,
            loaded: 0,
            total: self.len,
            progress,
        };
        stream::try_unfold(reader, ChunkReader::next_chunk)
    }
}

struct ChunkReader {
    file: File,
    file_name: String,
    loaded: u64,
    total: u64,
    progress: ProgressSink,
}

impl ChunkReader {
    async fn next_chunk(mut self) -> Result<Option<(Vec<u8>, Self)>, SourceReadError> {
        let mut chunk = vec![0u8; UPLOAD_CHUNK_BYTES];
        let read = match self.file.read(&mut chunk).await {
            Ok(read) => read,
            Err(source) => return Err(self.failed(source)),
        };
        if read == 0 {
            if self.loaded < self.total {
                let shrunk = io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "file ended after {} of {} bytes",
                        self.loaded, self.total
                    ),
                );
                return Err(self.failed(shrunk));
            }
            return Ok(None);
        }

        chunk.truncate(read);
        self.loaded += read as u64;
        (self.progress)(UploadProgress::new(self.loaded, self.total.max(self.loaded)));
        Ok(Some((chunk, self)))
    }

    fn failed(&self, source: io::Error) -> SourceReadError {
        SourceReadError {
            file_name: self.file_name.clone(),
            source,
        }
    }
}
