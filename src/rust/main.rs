use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use sentiment_adapter::{
    run_jsonl, AdapterBuilder, AdapterConfig, ArtifactLocation, ModelManager, Preset, SentimentAdapter,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model artifact location: a directory, file:// URI or http(s):// base URL
    #[arg(short, long, env = "AIP_STORAGE_URI")]
    artifacts: String,

    /// Deployment preset providing labels and padding defaults
    #[arg(short, long, value_enum, default_value_t = Preset::ThreeClass)]
    preset: Preset,

    /// JSON adapter configuration; replaces the preset when given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache root for remote artifacts
    #[arg(long, env = "SENTIMENT_ADAPTER_CACHE")]
    cache_dir: Option<PathBuf>,

    /// Force a fresh download of remote artifacts
    #[arg(short, long)]
    fresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one `{"instances": [...]}` request document
    Predict {
        /// Request file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run a JSON Lines batch job, one instance per line
    Batch {
        #[arg(short, long)]
        input: PathBuf,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, default_value_t = 32)]
        batch_size: usize,
    },
}

fn adapter_config(args: &Args) -> anyhow::Result<AdapterConfig> {
    let mut config = match &args.config {
        Some(path) => AdapterConfig::from_file(path)
            .with_context(|| format!("Failed to read adapter config {:?}", path))?,
        None => args.preset.config(),
    };
    if args.cache_dir.is_some() {
        config.cache_dir = args.cache_dir.clone();
    }
    Ok(config)
}

async fn ensure_artifacts_fetched(args: &Args, config: &AdapterConfig) -> anyhow::Result<()> {
    let location = ArtifactLocation::parse(&args.artifacts)?;
    if let ArtifactLocation::Local(_) = location {
        return Ok(());
    }

    let manager = match &config.cache_dir {
        Some(dir) => ModelManager::new(dir)?,
        None => ModelManager::new_default()?,
    };
    if args.fresh {
        info!("Fresh download requested - removing any cached artifacts...");
        manager.remove(&location)?;
    }
    if !manager.is_fetched(&location) || !manager.verify(&location, &config.expected_hashes)? {
        manager.fetch(&location, &config.expected_hashes).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = adapter_config(&args)?;
    ensure_artifacts_fetched(&args, &config).await?;

    let start_time = Instant::now();
    let mut adapter: SentimentAdapter = AdapterBuilder::new().with_config(config).build()?;
    adapter
        .load(&args.artifacts)
        .with_context(|| format!("Failed to load artifacts from {}", args.artifacts))?;
    info!("Adapter loaded in {:.2?}", start_time.elapsed());

    match &args.command {
        Command::Predict { input } => {
            let mut raw = String::new();
            match input {
                Some(path) => {
                    File::open(path)
                        .with_context(|| format!("Failed to open {:?}", path))?
                        .read_to_string(&mut raw)?;
                }
                None => {
                    io::stdin().read_to_string(&mut raw)?;
                }
            }
            let request: serde_json::Value = serde_json::from_str(&raw).context("Request is not valid JSON")?;
            let response = adapter.predict_json(&request)?;
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &response)?;
            writeln!(stdout)?;
        }
        Command::Batch {
            input,
            output,
            batch_size,
        } => {
            let reader = BufReader::new(
                File::open(input).with_context(|| format!("Failed to open {:?}", input))?,
            );
            let summary = match output {
                Some(path) => run_jsonl(&adapter, reader, BufWriter::new(File::create(path)?), *batch_size)?,
                None => run_jsonl(&adapter, reader, BufWriter::new(io::stdout().lock()), *batch_size)?,
            };
            info!(
                "Wrote {} predictions in {} chunks (total {:.2?})",
                summary.instances,
                summary.chunks,
                start_time.elapsed()
            );
        }
    }

    Ok(())
}
