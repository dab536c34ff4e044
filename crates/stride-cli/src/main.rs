mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stride",
    about = "Natural-language assistant for goals, steps, habits, areas and metrics",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data root (default: auto-detect from .stride/)
    #[arg(long, global = true, env = "STRIDE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .stride/ with a default config
    Init,

    /// Serve the HTTP API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ask the assistant and preview what it would do
    Ask {
        /// The request, in plain language
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// User whose data is read and changed
        #[arg(long, short = 'u', env = "STRIDE_USER", default_value = "local")]
        user: String,

        /// Execute the proposal without asking
        #[arg(long, short = 'y')]
        yes: bool,

        /// Habit scope for a preview item, e.g. `0=scheduled`
        #[arg(long = "choice", value_name = "INDEX=SCOPE")]
        choices: Vec<String>,
    },

    /// Inspect the config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
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
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Ask {
            query,
            user,
            yes,
            choices,
        } => cmd::ask::run(&root, &query.join(" "), &user, yes, &choices, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
