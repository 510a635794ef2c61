// ABOUTME: clipmeta command line: extract, formats and support subcommands over clipmeta-core.
// ABOUTME: Prints {success, data} JSON envelopes on stdout and exits 1 with {success:false, error, code} on failure.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clipmeta_core::{Client, ExtractError, ExtractionRequest, MediaType};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Extract metadata and downloadable formats from video pages.
#[derive(Parser, Debug)]
#[command(name = "clipmeta")]
#[command(about = "Extract video metadata and formats from YouTube, TikTok, Instagram and Facebook pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Per-strategy timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Override the User-Agent sent to platforms.
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Output compact JSON instead of pretty.
    #[arg(long, global = true, default_value_t = false)]
    compact: bool,

    /// Raise the log level (repeatable). Logs go to stderr.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Metadata plus the formats matching the filters.
    Extract(ExtractArgs),
    /// Every usable format, optionally restricted to one media type.
    Formats {
        url: String,
        /// audio or video
        #[arg(long = "type")]
        media_type: Option<MediaType>,
    },
    /// Supported platforms, containers and quality tokens.
    Support { url: Option<String> },
}

#[derive(Args, Debug)]
struct ExtractArgs {
    url: String,

    /// Container to keep (default mp4).
    #[arg(long, conflicts_with = "any_format")]
    format: Option<String>,

    /// Keep every container.
    #[arg(long)]
    any_format: bool,

    /// Quality token; "highest" ranks best first (default).
    #[arg(long)]
    quality: Option<String>,

    /// Media type to keep: audio or video (default video).
    #[arg(long = "type", conflicts_with = "any_type")]
    media_type: Option<MediaType>,

    /// Keep every media type.
    #[arg(long)]
    any_type: bool,

    /// Select the best format's URL as the download link.
    #[arg(long)]
    download: bool,

    /// Metadata only; formats are dropped from the output.
    #[arg(long)]
    info: bool,
}

impl ExtractArgs {
    fn request(&self) -> ExtractionRequest {
        let mut request = ExtractionRequest::new(self.url.clone())
            .download_link(self.download)
            .info_only(self.info);
        if let Some(format) = &self.format {
            request = request.container(format.clone());
        }
        if self.any_format {
            request = request.any_container();
        }
        if let Some(quality) = &self.quality {
            request = request.quality(quality.clone());
        }
        if let Some(media_type) = self.media_type {
            request = request.media_type(media_type);
        }
        if self.any_type {
            request = request.any_media_type();
        }
        request
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<Value, ExtractError> {
    let mut builder = Client::builder().timeout(Duration::from_secs(cli.timeout));
    if let Some(ua) = &cli.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    let client = builder.build()?;

    match &cli.command {
        Command::Extract(args) => {
            let request = args.request();
            debug!(?request, "extract");
            let metadata = client.extract(&request).await?;
            Ok(json!({ "success": true, "data": metadata }))
        }
        Command::Formats { url, media_type } => {
            let report = client.formats(url, *media_type).await?;
            Ok(json!({
                "success": true,
                "platform": report.platform,
                "formats": report.formats,
            }))
        }
        Command::Support { url } => {
            let info = client.support(url.as_deref())?;
            Ok(json!({ "success": true, "data": info }))
        }
    }
}

fn error_envelope(err: &ExtractError) -> Value {
    json!({
        "success": false,
        "error": err.to_string(),
        "code": err.status_code(),
    })
}

fn print(value: &Value, compact: bool) -> Result<()> {
    if compact {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (envelope, status) = match run(&cli).await {
        Ok(envelope) => (envelope, ExitCode::SUCCESS),
        Err(err) => (error_envelope(&err), ExitCode::from(1)),
    };

    if let Err(err) = print(&envelope, cli.compact) {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    status
}
