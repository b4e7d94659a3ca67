//! Point d'entrée CLI pour areakit

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

use areakit_cli::Config;

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

const DEFAULT_STATE: &str = "areakit-state.json";
const DEFAULT_CONFIG: &str = "default";

/// Gérer les zones de requête spatiales
#[derive(Parser)]
#[command(name = "areakit")]
#[command(author, version)]
#[command(about = "Gérer les zones de requête spatiales: import, affichage, fusion, actions du menu, export")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier d'état de l'espace de travail (défaut: env AREAKIT_STATE ou areakit-state.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Preset de configuration (default/strict) ou chemin d'un fichier JSON (défaut: env AREAKIT_CONFIG)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Écrire le rapport d'opération en JSON
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let state = cli
        .state
        .or_else(|| std::env::var_os("AREAKIT_STATE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE));
    let config_source = cli
        .config
        .or_else(|| std::env::var("AREAKIT_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let config = Config::resolve(&config_source)?;
    debug!(state = %state.display(), config = %config_source, "Configuration loaded");

    cli::run(cli.command, &state, &config, cli.report.as_deref())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
