use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    error::SERVER_UNREACHABLE_MESSAGE, ArtifactDownloader, BackendTransport, ErrorCategory,
    HttpBackend, UploadController, UploadError,
};
use shared::domain::AudioFormat;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod progress;

use config::load_settings;
use progress::UploadBar;

#[derive(Parser, Debug)]
#[command(
    name = "uploader",
    about = "Upload audio to the marker service and fetch the XML/SRT results"
)]
struct Cli {
    /// Backend base URL, overrides settings and environment.
    #[arg(long, global = true)]
    backend_url: Option<String>,
    /// Settings file; `uploader.toml` in the working directory when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload an audio file and print the result links.
    Process {
        file: PathBuf,
        /// Download the three artifacts into this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        quiet: bool,
    },
    /// Check that the backend is reachable.
    Status,
    /// Show what the backend reports about itself.
    Info,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.backend_url {
        settings.backend_url = url;
    }
    let backend = Arc::new(HttpBackend::new(settings.controller_config()?));

    match cli.command {
        Command::Process {
            file,
            output_dir,
            quiet,
        } => process(backend, file, output_dir.or(settings.output_dir), quiet).await,
        Command::Status => status(&backend).await.map(|()| ExitCode::SUCCESS),
        Command::Info => server_info(&backend).await.map(|()| ExitCode::SUCCESS),
    }
}

fn exit_code(error: &UploadError) -> ExitCode {
    match error.category() {
        ErrorCategory::Validation => ExitCode::from(2),
        ErrorCategory::Connectivity => ExitCode::from(3),
        ErrorCategory::Transport => ExitCode::from(4),
        ErrorCategory::Processing => ExitCode::from(5),
        ErrorCategory::Control => ExitCode::from(130),
    }
}

async fn process(
    backend: Arc<HttpBackend>,
    file: PathBuf,
    output_dir: Option<PathBuf>,
    quiet: bool,
) -> Result<ExitCode> {
    let controller = Arc::new(UploadController::with_backend(backend));
    let selected = match controller.select_file(&file) {
        Ok(selected) => selected,
        Err(error) => {
            eprintln!("{error}");
            return Ok(exit_code(&error));
        }
    };
    info!(file = %selected.file_name(), "cli: submitting");

    let bar = UploadBar::new(!quiet).follow(controller.watch_state());
    let interrupt = {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("cli: interrupted, cancelling upload");
                controller.cancel();
            }
        })
    };

    let outcome = controller.submit().await;
    interrupt.abort();
    let _ = bar.await;

    let artifacts = match outcome {
        Ok(artifacts) => artifacts,
        Err(error) => {
            eprintln!("{error}");
            return Ok(exit_code(&error));
        }
    };

    for (kind, url) in artifacts.iter() {
        println!("{:<14} {url}", kind.label());
    }

    if let Some(dir) = output_dir {
        let saved = ArtifactDownloader::new()
            .download_all(&artifacts, &dir)
            .await?;
        for artifact in saved {
            println!(
                "saved {} -> {} ({} bytes)",
                artifact.kind.label(),
                artifact.path.display(),
                artifact.bytes
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn status(backend: &HttpBackend) -> Result<()> {
    let url = backend.config().backend_url();
    match backend.probe_status().await {
        Ok(Some(status)) => {
            println!("{url}: {}", status.status);
            if let Some(dir) = status.upload_directory {
                let exists = status.upload_directory_exists.unwrap_or(false);
                println!("upload directory: {dir} (exists: {exists})");
            }
            if let Some(time) = status.server_time {
                println!("server time: {time}");
            }
            Ok(())
        }
        Ok(None) => {
            println!("{url}: reachable");
            Ok(())
        }
        Err(error) => bail!("{SERVER_UNREACHABLE_MESSAGE} ({url}: {error})"),
    }
}

async fn server_info(backend: &HttpBackend) -> Result<()> {
    let info = match backend.server_info().await {
        Ok(info) => info,
        Err(error) => bail!("failed to fetch server info: {}", error.user_message()),
    };
    println!("{} {} ({})", info.name, info.version, info.status);
    for (name, path) in &info.endpoints {
        println!("  {name:<10} {path}");
    }
    println!("supported formats: {}", info.supported_formats.join(", "));

    let unsupported: Vec<&str> = AudioFormat::ALL
        .iter()
        .map(|format| format.extension())
        .filter(|ext| !info.supported_formats.iter().any(|supported| supported == ext))
        .collect();
    if !unsupported.is_empty() {
        warn!(
            formats = %unsupported.join(", "),
            "cli: backend does not list formats this client accepts"
        );
    }
    Ok(())
}
