use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use kvstream_sdk::{
    InMemoryKvStore, KvStore, ReaderSource, SinkOptions, StreamConfig, StreamStore,
};
use serde::Serialize;

use crate::cli::*;

type Store = StreamStore<InMemoryKvStore>;

/// What a write committed, as printed to the user.
#[derive(Debug, Serialize)]
struct Report {
    key: String,
    digest: Option<String>,
    length: u64,
    ttl_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    copied: Option<u64>,
    /// Always `false`: the store only lives for one command.
    persisted: bool,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => StreamConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StreamConfig::default(),
    };
    let store = StreamStore::new(InMemoryKvStore::new()).with_config(config);

    let report = match cli.command {
        Command::Put(args) => cmd_put(&store, &args.path, &args.write).await?,
        Command::Copy(args) => cmd_copy(&store, &args.input, &args.output, &args.write).await?,
    };
    print_report(&report, &cli.format)
}

fn sink_options(store: &Store, args: &WriteArgs) -> SinkOptions {
    let mut options = store.sink_options();
    if let Some(window_size) = args.window_size {
        options.window_size = window_size;
    }
    if let Some(max_bytes) = args.max_bytes {
        options.max_bytes = Some(max_bytes);
    }
    if let Some(ttl) = args.ttl {
        options.ttl = Some(Duration::from_secs(ttl));
    }
    if let Some(digest) = args.digest {
        options.digest = Some(digest);
    }
    options
}

async fn cmd_put(store: &Store, path: &Path, args: &WriteArgs) -> anyhow::Result<Report> {
    let options = sink_options(store, args);
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let source = ReaderSource::new(file).with_window_size(options.window_size)?;
    let ttl_seconds = options.ttl.map(|ttl| ttl.as_secs());

    let sink = store.write_all(source, args.key.as_deref(), options).await?;
    let key = sink
        .commit_key()
        .context("write finished without a commit key")?
        .to_string();
    tracing::info!(key = %key, length = sink.length(), "stored {}", path.display());

    Ok(Report {
        key,
        digest: sink.digest().map(str::to_string),
        length: sink.length(),
        ttl_seconds,
        copied: None,
        persisted: false,
    })
}

async fn cmd_copy(
    store: &Store,
    input: &Path,
    output: &Path,
    args: &WriteArgs,
) -> anyhow::Result<Report> {
    let mut report = cmd_put(store, input, args).await?;
    let mut file = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("failed to create {}", output.display()))?;
    let copied = store.copy_to(&report.key, &mut file).await?;
    if copied != report.length {
        bail!("read back {copied} bytes, expected {}", report.length);
    }
    store.delete(&report.key).await?;
    report.copied = Some(copied);
    Ok(report)
}

fn print_report(report: &Report, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!(
                "{} Streamed and committed in-process as {}",
                "✓".green().bold(),
                report.key.yellow()
            );
            println!("  Length: {} bytes", report.length.to_string().bold());
            if let Some(digest) = &report.digest {
                println!("  Digest: {}", digest.cyan());
            }
            if let Some(ttl) = report.ttl_seconds {
                println!("  Expires in: {ttl}s");
            }
            if let Some(copied) = report.copied {
                println!("  Copied back: {} bytes", copied.to_string().bold());
            }
            println!("  {}", "In-memory store discarded on exit; nothing persisted".dimmed());
        }
    }
    Ok(())
}
