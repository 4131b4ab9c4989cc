use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::UnsupportedFileType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::M4a];

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => ".mp3",
            AudioFormat::Wav => ".wav",
            AudioFormat::M4a => ".m4a",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::M4a => "audio/mp4",
        }
    }

    // suffix from the last `.`, so a bare ".wav" matches too
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let dot = file_name.rfind('.')?;
        let suffix = file_name[dot..].to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extension() == suffix)
    }

    pub fn accepted_list() -> String {
        Self::ALL
            .iter()
            .map(|format| format.extension())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    path: PathBuf,
    file_name: String,
    format: AudioFormat,
}

impl SelectedFile {
    /// Validates the file name only; the file is not touched on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UnsupportedFileType> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let format = AudioFormat::from_file_name(&file_name)
            .ok_or_else(|| UnsupportedFileType::new(file_name.clone()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Xml,
    Srt,
    Audio,
}

impl ArtifactKind {
    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Xml => "XML markers",
            ArtifactKind::Srt => "SRT subtitles",
            ArtifactKind::Audio => "Audio",
        }
    }

    pub fn fallback_file_name(self) -> &'static str {
        match self {
            ArtifactKind::Xml => "markers.xml",
            ArtifactKind::Srt => "subtitles.srt",
            ArtifactKind::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultArtifacts {
    pub xml_url: String,
    pub srt_url: String,
    pub audio_url: String,
}

impl ResultArtifacts {
    pub fn url(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Xml => &self.xml_url,
            ArtifactKind::Srt => &self.srt_url,
            ArtifactKind::Audio => &self.audio_url,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        [ArtifactKind::Xml, ArtifactKind::Srt, ArtifactKind::Audio]
            .into_iter()
            .map(move |kind| (kind, self.url(kind)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn new(loaded: u64, total: u64) -> Self {
        Self { loaded, total }
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let percent = (self.loaded as f64 * 100.0 / self.total as f64).round();
        percent.clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_extensions_case_insensitively() {
        for name in ["song.mp3", "SONG.MP3", "take.Wav", "voice.m4A", "a.b.c.wav", ".wav"] {
            assert!(
                AudioFormat::from_file_name(name).is_some(),
                "{name} should be accepted"
            );
        }
    }

    #[test]
    fn rejects_other_suffixes() {
        for name in ["song.flac", "song.mp3.txt", "mp3", "song.", "", "song.mp4", "wav"] {
            assert!(
                AudioFormat::from_file_name(name).is_none(),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn selected_file_keeps_name_and_format() {
        let file = SelectedFile::from_path("/tmp/uploads/Interview.M4A").expect("valid");
        assert_eq!(file.file_name(), "Interview.M4A");
        assert_eq!(file.format(), AudioFormat::M4a);
        assert_eq!(file.format().mime_type(), "audio/mp4");
    }

    #[test]
    fn selected_file_rejects_unsupported_name() {
        let err = SelectedFile::from_path("notes.txt").expect_err("must reject");
        assert_eq!(err.file_name, "notes.txt");
        assert!(err.to_string().contains(".mp3, .wav, .m4a"));
    }

    #[test]
    fn progress_percent_rounds_and_clamps() {
        assert_eq!(UploadProgress::new(50, 200).percent(), 25);
        assert_eq!(UploadProgress::new(1, 3).percent(), 33);
        assert_eq!(UploadProgress::new(2, 3).percent(), 67);
        assert_eq!(UploadProgress::new(200, 200).percent(), 100);
        assert_eq!(UploadProgress::new(300, 200).percent(), 100);
        assert_eq!(UploadProgress::new(10, 0).percent(), 0);
    }

    #[test]
    fn artifacts_iterate_in_display_order() {
        let artifacts = ResultArtifacts {
            xml_url: "a".into(),
            srt_url: "b".into(),
            audio_url: "c".into(),
        };
        let collected: Vec<_> = artifacts.iter().collect();
        assert_eq!(
            collected,
            vec![
                (ArtifactKind::Xml, "a"),
                (ArtifactKind::Srt, "b"),
                (ArtifactKind::Audio, "c"),
            ]
        );
    }
}
