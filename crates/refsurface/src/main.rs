use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use refsurface::config::Config;
use refsurface::orchestrator::run_analysis;
use refsurface::registry::PlatformRegistry;
use refsurface::symbols::Universe;

/// Analyze a universe snapshot and produce the declaration/dependency report
/// consumed by the source emitter and project writers.
#[derive(Debug, Parser)]
#[command(name = "refsurface", version, about)]
struct Cli {
    /// Path to the universe snapshot (JSON).
    universe: PathBuf,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let raw = std::fs::read_to_string(&cli.universe)
        .with_context(|| format!("failed to read universe snapshot {}", cli.universe.display()))?;
    let universe = Universe::from_json(&raw)
        .with_context(|| format!("invalid universe snapshot {}", cli.universe.display()))?;

    let registry = PlatformRegistry::from_config(&config);
    let report = run_analysis(&universe, &registry, &config)?;

    let rendered = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{rendered}"),
    }

    Ok(())
}
