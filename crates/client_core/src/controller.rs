use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::domain::{ResultArtifacts, SelectedFile, UploadProgress};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{info, warn};

use crate::{
    config::ControllerConfig,
    error::UploadError,
    source::{AudioSource, ProgressSink},
    state::{uploading_status, UploadEvent, UploadState},
    transport::{BackendTransport, HttpBackend},
};

const EVENT_CAPACITY: usize = 128;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Reporter {
    state: watch::Sender<UploadState>,
    events: broadcast::Sender<UploadEvent>,
}

impl Reporter {
    fn set(&self, state: UploadState) {
        let events = match &state {
            UploadState::Idle => vec![UploadEvent::Reset],
            UploadState::Probing | UploadState::Uploading { .. } => state
                .status_text()
                .map(UploadEvent::Status)
                .into_iter()
                .collect(),
            UploadState::Succeeded(artifacts) => state
                .status_text()
                .map(UploadEvent::Status)
                .into_iter()
                .chain([UploadEvent::Succeeded(artifacts.clone())])
                .collect(),
            UploadState::Failed(error) => vec![UploadEvent::Error(error.clone())],
        };
        self.state.send_replace(state);
        for event in events {
            // no subscribers is fine
            let _ = self.events.send(event);
        }
    }

    /// Only applies while uploading; repeated percentages are dropped.
    fn progress(&self, progress: UploadProgress) {
        let percent = progress.percent();
        let changed = self.state.send_if_modified(|state| match state {
            UploadState::Uploading { progress } if *progress != percent => {
                *progress = percent;
                true
            }
            _ => false,
        });
        if changed {
            let _ = self.events.send(UploadEvent::Status(uploading_status(percent)));
        }
    }
}

struct Inflight {
    cancel: Option<oneshot::Sender<()>>,
    cancel_requested: bool,
}

/// Drives one upload-and-process request at a time. A concurrent `submit` or
/// `select_file` gets [`UploadError::Busy`].
pub struct UploadController {
    backend: Arc<dyn BackendTransport>,
    selection: Mutex<Option<SelectedFile>>,
    inflight: Mutex<Option<Inflight>>,
    reporter: Arc<Reporter>,
}

impl UploadController {
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_backend(Arc::new(HttpBackend::new(config)))
    }

    pub fn with_backend(backend: Arc<dyn BackendTransport>) -> Self {
        let (state, _) = watch::channel(UploadState::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            selection: Mutex::new(None),
            inflight: Mutex::new(None),
            reporter: Arc::new(Reporter { state, events }),
        }
    }

    pub fn state(&self) -> UploadState {
        self.reporter.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<UploadState> {
        self.reporter.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.reporter.events.subscribe()
    }

    pub fn selection(&self) -> Option<SelectedFile> {
        lock(&self.selection).clone()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.inflight).is_some()
    }

    /// A rejected name moves the state to `Failed` but keeps the previous
    /// selection.
    pub fn select_file(&self, path: impl AsRef<Path>) -> Result<SelectedFile, UploadError> {
        let inflight = lock(&self.inflight);
        if inflight.is_some() {
            return Err(UploadError::Busy);
        }

        match SelectedFile::from_path(path) {
            Ok(file) => {
                info!(file = %file.file_name(), format = %file.format(), "upload: file selected");
                *lock(&self.selection) = Some(file.clone());
                self.reporter.set(UploadState::Idle);
                Ok(file)
            }
            Err(rejected) => {
                warn!(file = %rejected.file_name, "upload: unsupported file type");
                let error = UploadError::from(rejected);
                self.reporter.set(UploadState::Failed(error.clone()));
                Err(error)
            }
        }
    }

    pub async fn submit(&self) -> Result<ResultArtifacts, UploadError> {
        let (guard, cancelled) = self.begin()?;

        let Some(selected) = self.selection() else {
            return guard.settle(Err(UploadError::NoFileSelected));
        };

        let outcome = tokio::select! {
            biased;
            _ = cancelled => {
                info!(file = %selected.file_name(), "upload: cancelled");
                Err(UploadError::Cancelled)
            }
            outcome = self.run(&selected) => outcome,
        };
        guard.settle(outcome)
    }

    /// Returns `true` only when the running submission will settle as
    /// `Cancelled`.
    pub fn cancel(&self) -> bool {
        let mut inflight = lock(&self.inflight);
        let Some(slot) = inflight.as_mut() else {
            return false;
        };
        let Some(sender) = slot.cancel.take() else {
            return false;
        };
        slot.cancel_requested = sender.send(()).is_ok();
        slot.cancel_requested
    }

    fn begin(&self) -> Result<(InflightGuard<'_>, oneshot::Receiver<()>), UploadError> {
        let mut inflight = lock(&self.inflight);
        if inflight.is_some() {
            warn!("upload: submit rejected, another upload is in flight");
            return Err(UploadError::Busy);
        }
        let (tx, rx) = oneshot::channel();
        *inflight = Some(Inflight {
            cancel: Some(tx),
            cancel_requested: false,
        });
        Ok((
            InflightGuard {
                controller: self,
                settled: false,
            },
            rx,
        ))
    }

    async fn run(&self, selected: &SelectedFile) -> Result<ResultArtifacts, UploadError> {
        let source = AudioSource::open(selected).await?;

        self.reporter.set(UploadState::Probing);
        if let Err(error) = self.backend.probe_status().await {
            warn!(%error, "upload: liveness probe failed, upload skipped");
            return Err(UploadError::ServerUnreachable);
        }

        self.reporter.set(UploadState::Uploading { progress: 0 });
        let reporter = self.reporter.clone();
        let sink: ProgressSink =
            Arc::new(move |progress: UploadProgress| reporter.progress(progress));
        let response = self.backend.upload(source, sink).await?;

        match response.into_artifacts() {
            Some(artifacts) => {
                info!(file = %selected.file_name(), "upload: processing completed");
                Ok(artifacts)
            }
            None => {
                warn!(file = %selected.file_name(), "upload: backend reported a processing failure");
                Err(UploadError::Processing)
            }
        }
    }
}

// Dropped unsettled, the submission resolves to `Cancelled`.
struct InflightGuard<'a> {
    controller: &'a UploadController,
    settled: bool,
}

impl InflightGuard<'_> {
    fn settle(
        mut self,
        outcome: Result<ResultArtifacts, UploadError>,
    ) -> Result<ResultArtifacts, UploadError> {
        self.settled = true;
        self.release(outcome)
    }

    fn release(
        &self,
        outcome: Result<ResultArtifacts, UploadError>,
    ) -> Result<ResultArtifacts, UploadError> {
        let mut inflight = lock(&self.controller.inflight);
        let cancel_requested = inflight.take().is_some_and(|slot| slot.cancel_requested);
        // a cancel acknowledged after the run finished still wins
        let outcome = match outcome {
            Ok(_) if cancel_requested => Err(UploadError::Cancelled),
            outcome => outcome,
        };
        let state = match &outcome {
            Ok(artifacts) => UploadState::Succeeded(artifacts.clone()),
            Err(error) => UploadState::Failed(error.clone()),
        };
        self.controller.reporter.set(state);
        outcome
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self.release(Err(UploadError::Cancelled));
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
