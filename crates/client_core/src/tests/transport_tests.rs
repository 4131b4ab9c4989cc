use super::*;

use std::{io::Write, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{ResultArtifacts, SelectedFile, UploadProgress};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{
    error::{UploadError, CONNECTION_ERROR_MESSAGE},
    UploadController,
};

#[derive(Debug, Clone)]
struct ReceivedPart {
    field: Option<String>,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct MockState {
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
    status_code: StatusCode,
    upload_code: StatusCode,
    upload_body: Value,
}

impl MockState {
    fn new(upload_code: StatusCode, upload_body: Value) -> Self {
        Self {
            parts: Arc::new(Mutex::new(Vec::new())),
            status_code: StatusCode::OK,
            upload_code,
            upload_body,
        }
    }

    fn succeeding() -> Self {
        Self::new(
            StatusCode::OK,
            json!({
                "status": "success",
                "message": "Archivo procesado exitosamente",
                "data": {
                    "xml_url": "http://localhost:5001/files/audio_1.xml",
                    "srt_url": "http://localhost:5001/files/audio_1.srt",
                    "audio_url": "http://localhost:5001/files/audio_1.wav"
                }
            }),
        )
    }
}

async fn mock_status(State(state): State<MockState>) -> (StatusCode, Json<Value>) {
    (
        state.status_code,
        Json(json!({
            "status": "online",
            "upload_directory": "audiosrt",
            "upload_directory_exists": true,
            "server_time": "2024-05-01T10:20:30.123456"
        })),
    )
}

async fn mock_upload(
    State(state): State<MockState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let Ok(bytes) = field.bytes().await else {
            return (StatusCode::BAD_REQUEST, Json(json!({"detail": "truncated body"})));
        };
        let bytes = bytes.to_vec();
        state.parts.lock().await.push(ReceivedPart {
            field: field_name,
            file_name,
            content_type,
            bytes,
        });
    }
    (state.upload_code, Json(state.upload_body.clone()))
}

async fn mock_info() -> Json<Value> {
    Json(json!({
        "name": "Sound to XML API",
        "version": "1.0.0",
        "status": "running",
        "endpoints": {
            "upload": "/upload",
            "download": "/download/{filename}",
            "status": "/status"
        },
        "supported_formats": [".mp3", ".wav", ".m4a"]
    }))
}

async fn spawn_backend(state: MockState) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/", get(mock_info))
        .route("/status", get(mock_status))
        .route("/upload", post(mock_upload))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn backend_for(url: &str) -> HttpBackend {
    HttpBackend::new(ControllerConfig::new(url).expect("config"))
}

fn audio_file(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp audio file");
    file.write_all(bytes).expect("write audio");
    file
}

async fn open_source(file: &tempfile::NamedTempFile) -> AudioSource {
    let selected = SelectedFile::from_path(file.path()).expect("selected");
    AudioSource::open(&selected).await.expect("open")
}

fn recording_sink() -> (ProgressSink, Arc<std::sync::Mutex<Vec<UploadProgress>>>) {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink: ProgressSink = Arc::new(move |progress: UploadProgress| {
        sink_seen.lock().expect("lock").push(progress);
    });
    (sink, seen)
}

#[tokio::test]
async fn upload_posts_file_under_multipart_file_field() {
    let state = MockState::succeeding();
    let url = spawn_backend(state.clone()).await.expect("spawn backend");
    let payload = b"RIFF....WAVEfmt fake audio".repeat(100);
    let file = audio_file(".wav", &payload);
    let source = open_source(&file).await;
    let expected_name = source.file_name().to_string();
    let (sink, seen) = recording_sink();

    let response = backend_for(&url)
        .upload(source, sink)
        .await
        .expect("upload");

    let artifacts = response.into_artifacts().expect("artifacts");
    assert_eq!(artifacts.srt_url, "http://localhost:5001/files/audio_1.srt");

    let parts = state.parts.lock().await.clone();
    assert_eq!(parts.len(), 1);
    let part = &parts[0];
    assert_eq!(part.field.as_deref(), Some("file"));
    assert_eq!(part.file_name.as_deref(), Some(expected_name.as_str()));
    assert_eq!(part.content_type.as_deref(), Some("audio/wav"));
    assert_eq!(part.bytes, payload);

    let total = payload.len() as u64;
    let seen = seen.lock().expect("lock").clone();
    assert_eq!(seen.last().copied(), Some(UploadProgress::new(total, total)));
}

#[tokio::test]
async fn upload_rejection_keeps_server_detail() {
    let state = MockState::new(
        StatusCode::BAD_REQUEST,
        json!({"detail": "Tipo de archivo no permitido. Use: .mp3, .wav, .m4a"}),
    );
    let url = spawn_backend(state).await.expect("spawn backend");
    let file = audio_file(".mp3", b"ID3 fake");
    let (sink, _) = recording_sink();

    let err = backend_for(&url)
        .upload(open_source(&file).await, sink)
        .await
        .expect_err("must be rejected");

    assert_eq!(
        err,
        TransportError::Rejected {
            status: 400,
            detail: Some("Tipo de archivo no permitido. Use: .mp3, .wav, .m4a".into()),
        }
    );
}

#[tokio::test]
async fn upload_rejection_without_detail_uses_raw_text() {
    let state = MockState::new(StatusCode::BAD_GATEWAY, json!({"error": "upstream"}));
    let url = spawn_backend(state).await.expect("spawn backend");
    let file = audio_file(".mp3", b"ID3 fake");
    let (sink, _) = recording_sink();

    let err = backend_for(&url)
        .upload(open_source(&file).await, sink)
        .await
        .expect_err("must be rejected");

    assert_eq!(err.user_message(), "server responded with status 502");
}

#[tokio::test]
async fn file_shrinking_during_upload_is_a_local_error() {
    let state = MockState::succeeding();
    let url = spawn_backend(state.clone()).await.expect("spawn backend");
    let file = audio_file(".wav", &vec![5u8; 300_000]);
    let source = open_source(&file).await;
    let file_name = source.file_name().to_string();
    file.as_file().set_len(10).expect("truncate");
    let (sink, _) = recording_sink();

    let err = backend_for(&url)
        .upload(source, sink)
        .await
        .expect_err("short body must fail");

    assert!(matches!(err, TransportError::Io(_)), "{err:?}");
    let message = err.user_message();
    assert_ne!(message, CONNECTION_ERROR_MESSAGE);
    assert!(message.contains(&file_name), "{message}");
    assert!(message.contains("10 of 300000"), "{message}");
    assert!(state.parts.lock().await.is_empty());
}

#[tokio::test]
async fn probe_accepts_online_backend() {
    let url = spawn_backend(MockState::succeeding())
        .await
        .expect("spawn backend");

    let status = backend_for(&url)
        .probe_status()
        .await
        .expect("probe")
        .expect("status body");
    assert_eq!(status.status, "online");
    assert_eq!(status.upload_directory.as_deref(), Some("audiosrt"));
}

#[tokio::test]
async fn probe_rejects_non_success_status() {
    let mut state = MockState::succeeding();
    state.status_code = StatusCode::SERVICE_UNAVAILABLE;
    let url = spawn_backend(state).await.expect("spawn backend");

    let err = backend_for(&url)
        .probe_status()
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::Rejected { status: 503, .. }));
}

#[tokio::test]
async fn closed_port_is_reported_as_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = backend_for(&format!("http://{addr}"))
        .probe_status()
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::Unreachable(_)), "{err:?}");
    assert_eq!(err.user_message(), CONNECTION_ERROR_MESSAGE);
}

#[tokio::test]
async fn server_info_lists_supported_formats() {
    let url = spawn_backend(MockState::succeeding())
        .await
        .expect("spawn backend");

    let info = backend_for(&url).server_info().await.expect("info");
    assert_eq!(info.name, "Sound to XML API");
    assert_eq!(info.supported_formats, vec![".mp3", ".wav", ".m4a"]);
    assert_eq!(
        info.endpoints.get("status").map(String::as_str),
        Some("/status")
    );
}

#[tokio::test]
async fn controller_round_trip_over_http() {
    let state = MockState::succeeding();
    let url = spawn_backend(state.clone()).await.expect("spawn backend");
    let controller = UploadController::new(ControllerConfig::new(&url).expect("config"));
    let file = audio_file(".m4a", &[3u8; 4096]);
    controller.select_file(file.path()).expect("accept");

    let artifacts = controller.submit().await.expect("success");

    assert_eq!(
        artifacts,
        ResultArtifacts {
            xml_url: "http://localhost:5001/files/audio_1.xml".into(),
            srt_url: "http://localhost:5001/files/audio_1.srt".into(),
            audio_url: "http://localhost:5001/files/audio_1.wav".into(),
        }
    );
    assert_eq!(state.parts.lock().await.len(), 1);
}

#[tokio::test]
async fn controller_maps_http_detail_to_transport_error() {
    let state = MockState::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"detail": "Error en el procesamiento del audio: decoder crashed"}),
    );
    let url = spawn_backend(state).await.expect("spawn backend");
    let controller = UploadController::new(ControllerConfig::new(&url).expect("config"));
    let file = audio_file(".wav", &[0u8; 64]);
    controller.select_file(file.path()).expect("accept");

    let err = controller.submit().await.expect_err("must fail");
    assert_eq!(
        err,
        UploadError::Transport("Error en el procesamiento del audio: decoder crashed".into())
    );
    assert_eq!(
        err.to_string(),
        "Error: Error en el procesamiento del audio: decoder crashed"
    );
}
