mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Builds a static portfolio site from composable partials", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log every page and image as it is processed
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new site directory
    New { name: String },
    /// Build the site and replace the output directory
    Build {
        /// Site directory containing folio.toml
        #[arg(long, short)]
        input: Option<PathBuf>,

        #[arg(long, short, default_value = "dist")]
        output: PathBuf,

        /// Overrides `base_url` from folio.toml
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let result = match cli.command {
        Commands::New { name } => commands::new_site(&name),
        Commands::Build {
            input,
            output,
            base_url,
        } => commands::build_site(input.as_deref(), &output, base_url.as_deref()),
    };

    if let Err(error) = result {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}
