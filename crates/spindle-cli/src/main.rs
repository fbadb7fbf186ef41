use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spindle_core::{Engine, EngineConfig, ReverseUppercase, TaskId};

/// Run payloads through the spindle engine and print every outcome as a
/// JSON line. Logs go to stderr (RUST_LOG, default `info`).
#[derive(Debug, Parser)]
#[command(name = "spindle-cli")]
#[command(version, long_about = None)]
struct Args {
    /// Engine config (JSON). Defaults apply to every field left out.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Payloads to enqueue in order. Without any, one payload per stdin line.
    payloads: Vec<String>,
}

async fn read_stdin_payloads() -> Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut payloads = Vec::new();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        payloads.push(line);
    }
    Ok(payloads)
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let payloads = if args.payloads.is_empty() {
        read_stdin_payloads().await?
    } else {
        args.payloads
    };

    let engine = Engine::builder()
        .config(config)
        .processor(ReverseUppercase::new())
        .start()
        .context("starting engine")?;

    // enqueue より前に subscribe しないと outcome を取りこぼす
    let mut outcomes = engine.subscribe();

    let mut waiting: HashSet<TaskId> = HashSet::new();
    for payload in payloads {
        waiting.insert(engine.enqueue(payload)?);
    }
    info!(tasks = waiting.len(), "enqueued");

    while !waiting.is_empty() {
        let Some(event) = outcomes.recv().await else {
            warn!(remaining = waiting.len(), "outcome channel closed early");
            break;
        };
        waiting.remove(event.outcome().task_id());
        println!("{}", serde_json::to_string(&event)?);
    }

    let counts = engine.status().counts;
    // shutdown は worker スレッドを join するので runtime の外でやる
    tokio::task::spawn_blocking(move || engine.shutdown())
        .await
        .context("joining engine shutdown")?;
    info!(
        completed = counts.completed,
        failed = counts.failed,
        "done"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse()).await
}
