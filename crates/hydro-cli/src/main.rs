mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    grouping::GroupingSubcommand, issue::IssueSubcommand, station::StationSubcommand,
};
use context::TrackerArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hydro",
    about = "Keep each pumping station linked to exactly one active piece of equipment",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    tracker: TrackerArgs,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (and optionally a built front end)
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value = "4000")]
        port: u16,
        /// Directory with a built front end; index.html answers unknown paths
        #[arg(long)]
        static_dir: Option<PathBuf>,
        /// Open a browser once listening
        #[arg(long)]
        open: bool,
    },

    /// Inspect and reassign station equipment
    Station {
        #[command(subcommand)]
        subcommand: StationSubcommand,
    },

    /// List and assign groupings
    Grouping {
        #[command(subcommand)]
        subcommand: GroupingSubcommand,
    },

    /// Browse issues, move them through the workflow, read their links
    Issue {
        #[command(subcommand)]
        subcommand: IssueSubcommand,
    },

    /// Show the account the credentials belong to
    Whoami,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve {
            port,
            static_dir,
            open,
        } => cmd::serve::run(&cli.tracker, port, static_dir, open),
        Commands::Station { subcommand } => cmd::station::run(&cli.tracker, subcommand, cli.json),
        Commands::Grouping { subcommand } => {
            cmd::grouping::run(&cli.tracker, subcommand, cli.json)
        }
        Commands::Issue { subcommand } => cmd::issue::run(&cli.tracker, subcommand, cli.json),
        Commands::Whoami => cmd::whoami::run(&cli.tracker, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
