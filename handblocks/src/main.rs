//! handblocks: replay s-expression hand-tracking scripts through the gesture
//! engine and print one response per message.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use handblocks::config::EngineConfig;
use handblocks::ipc::ReplaySession;

#[derive(Parser, Debug)]
#[command(name = "handblocks", about = "Replay hand-tracking scripts through the gesture engine")]
struct Cli {
    /// Script with one s-expression message per line ("-" for stdin)
    script: Option<PathBuf>,

    /// Config plist (e.g. `(:pinch-threshold 0.35)`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every message and gesture transition to stderr
    #[arg(long)]
    trace: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("handblocks {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(script_path) = cli.script.as_deref() else {
        bail!("missing <SCRIPT> argument (use \"-\" for stdin)");
    };

    let default_filter = if cli.trace { "handblocks=trace" } else { "handblocks=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!("handblocks v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let script = read_script(script_path)?;

    let mut session = ReplaySession::new(config);
    for response in session.run_script(&script) {
        println!("{response}");
    }
    info!("Replayed {} frames", session.frames());
    Ok(())
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("reading script from stdin")
    } else {
        fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))
    }
}

// ── Tests ──────────────────────────────────────────────────
