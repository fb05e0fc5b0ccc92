mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "wavectl",
    about = "Task wave scheduling and static export verification",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .wavectl/ or .git/)
    #[arg(long, global = true, env = "WAVECTL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a source file: parse it and dump the full verification result
    Verify {
        file: PathBuf,
        /// Skip the content-hash cache and always re-parse
        #[arg(long)]
        no_cache: bool,
    },

    /// Check that an exported declaration with the given name exists
    CheckExport { file: PathBuf, name: String },

    /// Check that an exported function with the given name exists
    CheckFunction { file: PathBuf, name: String },

    /// Check (name, kind) claims against a file, e.g. User:interface
    CheckTypes {
        file: PathBuf,
        /// Claims as name:kind pairs (kinds: interface, type, enum, class, function)
        #[arg(required = true)]
        claims: Vec<String>,
    },

    /// Dump every top-level declaration found in a file
    Types { file: PathBuf },

    /// Print the content hash used as the cache key for a file
    Hash { file: PathBuf },

    /// Remove one cache entry, or the whole cache if no file is given
    ClearCache { file: Option<PathBuf> },

    /// Full parallelization analysis of a task-set document
    Analyze { source: PathBuf },

    /// Compact per-wave summary of a task-set document
    Waves { source: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Verify { file, no_cache } => cmd::verify::verify(&root, &file, no_cache, cli.json),
        Commands::CheckExport { file, name } => cmd::verify::check_export(&file, &name, cli.json),
        Commands::CheckFunction { file, name } => {
            cmd::verify::check_function(&file, &name, cli.json)
        }
        Commands::CheckTypes { file, claims } => cmd::verify::check_types(&file, &claims, cli.json),
        Commands::Types { file } => cmd::verify::types(&file, cli.json),
        Commands::Hash { file } => cmd::verify::hash(&file),
        Commands::ClearCache { file } => cmd::verify::clear_cache(&root, file.as_deref()),
        Commands::Analyze { source } => cmd::analyze::analyze(&root, &source, cli.json),
        Commands::Waves { source } => cmd::analyze::waves(&root, &source, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
