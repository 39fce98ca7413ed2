use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use face_match::{config, session, FaceMatcher};
use log::info;

#[derive(Parser)]
#[command(name = "face-match")]
#[command(version, about = "Biometric face-matching verification engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a reference identity photo against a live capture
    Compare {
        /// Reference identity image file
        #[arg(long)]
        id: PathBuf,
        /// Live capture image file
        #[arg(long)]
        live: PathBuf,
        /// Override the match threshold for this run
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Print the resolved embedding model path
    Model,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            id,
            live,
            threshold,
        } => compare(&id, &live, threshold),
        Commands::Model => model(),
    }
}

fn compare(id: &PathBuf, live: &PathBuf, threshold: Option<f32>) -> Result<()> {
    let mut cfg = config::Config::from_env();
    if let Some(t) = threshold {
        cfg.threshold = t;
    }
    let matcher = FaceMatcher::new(cfg);

    let id_b64 = read_as_base64(id)?;
    let live_b64 = read_as_base64(live)?;

    let result = matcher
        .compare(&id_b64, &live_b64)
        .context("comparing faces")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn model() -> Result<()> {
    let cfg = config::Config::from_env();
    let path = session::resolve_model_path(&cfg).context("resolving model path")?;
    info!("model: {}", path.display());
    println!("{}", path.display());
    Ok(())
}

fn read_as_base64(path: &PathBuf) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}
