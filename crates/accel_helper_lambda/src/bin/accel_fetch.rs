use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use accel_helper_core::transfer::{
    archive_digest, download_file, extract_downloaded_archive, trigger_dump, HelperTransport,
    DEFAULT_ARCHIVE_PATH, DEFAULT_PART_SIZE,
};
use accel_helper_core::HelperError;
use accel_helper_lambda::logging::{log_error, log_info};
use clap::Parser;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;

/// Pulls acceleration files out of a deployed helper function.
#[derive(Parser)]
#[command(
    name = "accel_fetch",
    about = "Dump, archive and download acceleration files from a deployed helper"
)]
struct Cli {
    /// HTTP trigger URL of the helper function
    #[arg(long, env = "ACCEL_HELPER_URL")]
    url: String,
    /// Directory the helper dumps into
    #[arg(long, default_value = "/tmp/sr")]
    source_dir: String,
    /// Archive path on the helper side
    #[arg(long, default_value = DEFAULT_ARCHIVE_PATH)]
    archive: String,
    /// Local file the archive is written to
    #[arg(long)]
    output: PathBuf,
    /// Unpack the archive into this directory and delete the downloaded file
    #[arg(long)]
    extract_dir: Option<PathBuf>,
    /// Bytes per range request
    #[arg(long, default_value_t = DEFAULT_PART_SIZE)]
    part_size: u32,
    /// Download an archive produced by an earlier run
    #[arg(long)]
    skip_dump: bool,
    /// Per-request timeout; requests wait indefinitely when unset
    #[arg(long)]
    timeout_secs: Option<u64>,
}

struct HttpHelperTransport {
    client: reqwest::blocking::Client,
    url: String,
}

impl HelperTransport for HttpHelperTransport {
    fn post(&self, body: &str) -> Result<String, HelperError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .send()
            .map_err(|error| HelperError::Transport(format!("request failed: {error}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|error| HelperError::Transport(format!("unreadable response: {error}")))?;
        if !status.is_success() {
            return Err(HelperError::Remote(format!("HTTP {status}: {text}")));
        }
        Ok(text)
    }
}

fn run(cli: &Cli) -> Result<(), HelperError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(cli.timeout_secs.map(Duration::from_secs))
        .build()
        .map_err(|error| HelperError::Transport(format!("failed to build http client: {error}")))?;
    let transport = HttpHelperTransport {
        client,
        url: cli.url.clone(),
    };

    if !cli.skip_dump {
        log_info(
            "accel_fetch",
            "dump_requested",
            json!({ "source_dir": cli.source_dir, "archive": cli.archive }),
        );
        let report = trigger_dump(&transport, &cli.source_dir, &cli.archive)?;
        log_info("accel_fetch", "dump_succeeded", json!({ "report": report }));
    }

    let contents = download_file(&transport, &cli.archive, cli.part_size)?;
    if let Some(parent) = cli
        .output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent).map_err(|source| HelperError::CreateDir {
            dir: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&cli.output, &contents).map_err(|error| {
        HelperError::io(format!("failed to write {}", cli.output.display()), error)
    })?;

    log_info(
        "accel_fetch",
        "archive_downloaded",
        json!({
            "output": cli.output.display().to_string(),
            "bytes": contents.len(),
            "sha256": archive_digest(&contents),
        }),
    );

    if let Some(extract_dir) = &cli.extract_dir {
        extract_downloaded_archive(&cli.output, extract_dir)?;
        log_info(
            "accel_fetch",
            "archive_extracted",
            json!({ "extract_dir": extract_dir.display().to_string() }),
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log_error(
                "accel_fetch",
                "fetch_failed",
                json!({ "error": error.to_string(), "causes": error.cause_chain() }),
            );
            ExitCode::FAILURE
        }
    }
}
