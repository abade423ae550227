//! bekreftelse - confirmation state machine as a JSON-lines process
//!
//! stdin:  one inbound record per line (`{"topic", "key", "value"}`)
//! stdout: one outbound record per line (`{"key", "value"}`)
//! stderr: logs
//!
//! Stops on EOF or Ctrl-C: the punctuator is stopped, queued records are
//! drained, and the final counts are logged.
//!
//! With `--state-file` the partition state is restored from that file on start
//! and written back (as a compacted changelog) on shutdown.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bekreftelse_core::app::{
    AppBuilder, PartitionChangelog, PartitionState, StatusCounts, decode_inbound, encode_outbound,
};
use bekreftelse_core::config::AppConfig;
use bekreftelse_core::domain::StaggerMap;
use bekreftelse_core::impls::{ChannelEventSink, OutboundRecord};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bekreftelse")]
#[command(about = "Confirmation state machine for job-seeker periods", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "BEKREFTELSE_CONFIG")]
    config: Option<PathBuf>,

    /// Stagger CSV file, overrides `stagger.path`
    #[arg(long, env = "BEKREFTELSE_STAGGER_FILE")]
    stagger: Option<PathBuf>,

    /// Number of partitions, overrides `topology.partitions`
    #[arg(long, env = "BEKREFTELSE_PARTITIONS")]
    partitions: Option<usize>,

    /// Partition state file, restored on start and written on shutdown
    #[arg(long, env = "BEKREFTELSE_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Run one sweep after stdin is exhausted, before shutting down
    #[arg(long)]
    sweep_on_eof: bool,

    /// Log level
    #[arg(long, env = "BEKREFTELSE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "BEKREFTELSE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(path) = &cli.stagger {
        config.stagger.path = Some(path.clone());
    }
    if let Some(partitions) = cli.partitions {
        config.topology.partitions = partitions;
    }

    let stagger = StaggerMap::load(&config.stagger).context("loading stagger map")?;
    tracing::info!(entries = stagger.len(), "stagger map loaded");

    let (sink, outbound) = ChannelEventSink::new(config.topology.queue_capacity);
    let writer = tokio::spawn(write_outbound(outbound));

    let mut builder = AppBuilder::new(config).stagger(stagger).event_sink(sink);
    if let Some(path) = &cli.state_file {
        if let Some(states) = load_state(path).await? {
            builder = builder.resume_from(states);
        }
    }
    let group = builder.build().context("building app")?.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut accepted = 0usize;
    let mut rejected = 0usize;
    let mut eof = false;

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
            line = lines.next_line() => line.context("reading stdin")?,
        };
        let Some(line) = line else {
            eof = true;
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match decode_inbound(&line) {
            Ok(record) => {
                if let Err(e) = group.submit(record).await {
                    tracing::error!(error = %e, "runtime stopped accepting records");
                    break;
                }
                accepted += 1;
            }
            Err(e) => {
                rejected += 1;
                tracing::warn!(error = %e, "skipping malformed record");
            }
        }
    }

    if eof && cli.sweep_on_eof {
        let report = group.sweep_now().await.context("final sweep")?;
        tracing::info!(
            visited = report.visited,
            reconciled = report.reconciled,
            events = report.events,
            "final sweep finished"
        );
    }

    let states = group.shutdown_and_join().await;
    let counts = states
        .iter()
        .map(|s| s.counts())
        .fold(StatusCounts::default(), StatusCounts::merge);
    tracing::info!(
        accepted,
        rejected,
        counts = %serde_json::to_string(&counts)?,
        "stopped"
    );

    if let Some(path) = &cli.state_file {
        save_state(path, &states).await?;
    }

    // Every sink clone is gone with the partitions, so the writer ends.
    writer.await.context("outbound writer task")??;
    Ok(())
}

async fn load_state(path: &Path) -> anyhow::Result<Option<Vec<PartitionState>>> {
    let json = match tokio::fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no state file, starting empty");
            return Ok(None);
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let changelogs: Vec<PartitionChangelog> =
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    tracing::info!(path = %path.display(), partitions = changelogs.len(), "state restored");
    Ok(Some(changelogs.into_iter().map(PartitionState::restore).collect()))
}

/// Write to a sibling temp file, then rename over the old state.
async fn save_state(path: &Path, states: &[PartitionState]) -> anyhow::Result<()> {
    let changelogs: Vec<PartitionChangelog> = states.iter().map(PartitionState::changelog).collect();
    let json = serde_json::to_string(&changelogs)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("replacing {}", path.display()))?;
    tracing::info!(path = %path.display(), "state saved");
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn write_outbound(mut outbound: mpsc::Receiver<OutboundRecord>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(record) = outbound.recv().await {
        let mut line = encode_outbound(&record)?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
