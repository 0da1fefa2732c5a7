//! CLI binary for pdf2audio.
//!
//! A thin shim over the library crate for invoking the pipeline locally
//! against a real bucket — the same code path a storage trigger runs,
//! fed by flags instead of an event payload. Deployment as an actual
//! cloud trigger is packaging, not code, and stays out of this crate.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2audio::{run, AudioEncoding, ObjectFinalizeEvent, PipelineConfig, TriggerOutcome};
use tracing_subscriber::EnvFilter;

/// Narrate a PDF in a Cloud Storage bucket as MP3.
#[derive(Debug, Parser)]
#[command(name = "pdf2audio", version, about)]
struct Cli {
    /// Bucket containing the PDF (and receiving the MP3).
    #[arg(long)]
    bucket: String,

    /// Object name of the PDF within the bucket.
    #[arg(long)]
    name: String,

    /// Voice locale for synthesis.
    #[arg(long, default_value = "en-US")]
    language_code: String,

    /// Seconds to wait for the OCR operation before failing.
    #[arg(long, default_value_t = 540)]
    ocr_timeout: u64,

    /// Existence-probe attempts before giving up on the source object.
    #[arg(long, default_value_t = 5)]
    resolve_attempts: u32,

    /// Verbose logging (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "pdf2audio=info",
        1 => "pdf2audio=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = PipelineConfig::builder()
        .language_code(&cli.language_code)
        .audio_encoding(AudioEncoding::Mp3)
        .ocr_timeout_secs(cli.ocr_timeout)
        .resolve_max_attempts(cli.resolve_attempts)
        .build()
        .context("invalid configuration")?;

    let event = ObjectFinalizeEvent::new(&cli.bucket, &cli.name);
    let outcome = run(&event, config)
        .await
        .with_context(|| format!("pipeline failed for gs://{}/{}", cli.bucket, cli.name))?;

    match outcome {
        TriggerOutcome::Skipped => {
            println!("skipped: '{}' is not a PDF", cli.name);
        }
        TriggerOutcome::Completed {
            audio_object,
            pages,
        } => {
            println!(
                "done: gs://{}/{} ({} pages narrated)",
                cli.bucket, audio_object, pages
            );
        }
    }
    Ok(())
}
