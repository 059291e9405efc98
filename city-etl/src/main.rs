//! Point d'entrée CLI pour city-etl

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

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

/// Publier les données ouvertes du tableau de bord urbain dans PostGIS
#[derive(Parser)]
#[command(name = "city-etl")]
#[command(author, version)]
#[command(about = "Fetch, normalize and load city dashboard open data into PostGIS")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run {
            pipeline,
            config,
            dry_run,
            report,
            db,
        } => {
            info!(pipeline = %pipeline, dry_run, "Running pipeline");
            cli::cmd_run(&pipeline, config.as_deref(), dry_run, report.as_deref(), db).await?;
        }
        Commands::List => cli::cmd_list(),
        Commands::ToGeojson {
            pipeline,
            output,
            config,
        } => {
            info!(pipeline = %pipeline, output = %output.display(), "Export vers GeoJSON");
            cli::cmd_export(&pipeline, &output, config.as_deref()).await?;
        }
    }

    Ok(())
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
        .init();
}
