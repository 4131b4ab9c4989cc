use client_core::UploadState;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::{sync::watch, task::JoinHandle};

/// Terminal rendering of the controller state: one bar for the upload,
/// finished or abandoned when the submission settles.
pub struct UploadBar {
    pb: ProgressBar,
}

impl UploadBar {
    pub fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                pb: ProgressBar::hidden(),
            };
        }
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {msg:<20} [{bar:40.cyan/blue}] {pos:>3}%",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Self { pb }
    }

    /// Returns `true` once the state is terminal.
    fn render(&self, state: &UploadState) -> bool {
        match state {
            UploadState::Idle => false,
            UploadState::Probing => {
                self.pb.set_message(state.status_text().unwrap_or_default());
                false
            }
            UploadState::Uploading { progress } => {
                self.pb.set_position(u64::from(*progress));
                self.pb.set_message("Uploading");
                if *progress == 100 {
                    self.pb.set_message("Processing");
                }
                false
            }
            UploadState::Succeeded(_) => {
                self.pb.set_position(100);
                self.pb
                    .finish_with_message(state.status_text().unwrap_or_default());
                true
            }
            UploadState::Failed(error) => {
                self.pb.abandon_with_message(error.to_string());
                true
            }
        }
    }

    pub fn follow(self, mut states: watch::Receiver<UploadState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                if self.render(&state) {
                    break;
                }
            }
        })
    }
}
