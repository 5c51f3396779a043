//! `recite`: submit one recorded recitation from the command line.
//!
//! The recording is read from a file, sent with the reference ayah to the
//! gateway, and the report is printed to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tajweed_gateway::client::{
    ClientError, FileCapture, HttpTransport, RecitationClient, SubmissionOutcome, TerminalView,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "Send a recitation to the Tajweed gateway")]
struct Cli {
    /// Full URL of the analysis endpoint
    #[arg(
        long,
        env = "RECITE_ENDPOINT",
        default_value = "http://127.0.0.1:8080/analyze-tajweed"
    )]
    endpoint: String,

    /// The reference ayah being recited
    #[arg(long)]
    ayah: String,

    /// Recorded audio to submit
    #[arg(long)]
    audio: PathBuf,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tajweed_gateway=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    let cli = Cli::parse();

    let transport = HttpTransport::new(&cli.endpoint, Duration::from_secs(cli.timeout_seconds))
        .context("Failed to build HTTP client")?;
    let mut client = RecitationClient::new(
        FileCapture::new(&cli.audio),
        transport,
        TerminalView::new(std::io::stdout()),
    );
    client.set_reference_text(cli.ayah);

    // Start, then stop straight away: the file is the whole recording
    match client.press_trigger().await {
        Ok(_) => {}
        Err(ClientError::PermissionDenied(e)) => {
            tracing::error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    }

    let outcome = client
        .press_trigger()
        .await?
        .context("Recording did not produce an outcome")?;

    Ok(match outcome {
        SubmissionOutcome::Report(_) => ExitCode::SUCCESS,
        SubmissionOutcome::LocalValidation(_) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    })
}
