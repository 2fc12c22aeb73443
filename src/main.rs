use clap::{Parser, Subcommand};
use timecamp_sync::adapters::storage_from_env;
use timecamp_sync::app::{commands, logging};
use timecamp_sync::domain::SyncError;

#[derive(Parser)]
#[command(name = "timecamp-sync")]
#[command(version)]
#[command(
    about = "Reconcile an external people directory into a TimeCamp account",
    long_about = None
)]
struct Cli {
    /// Enable debug logging on the console
    #[arg(long, global = true)]
    debug: bool,
    /// Disable the rotating log file under logs/
    #[arg(long, global = true)]
    no_file_log: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Model the roster into the Target Document (Stage A)
    Prepare {
        /// Compute and log without writing the output document
        #[arg(long)]
        dry_run: bool,
        /// Output document name
        #[arg(long, default_value = "var/timecamp_users.json")]
        output: String,
    },
    /// Reconcile users and groups against the target account (Stage B)
    SyncUsers {
        /// Log every intended mutation without issuing it
        #[arg(long)]
        dry_run: bool,
        /// Input document name
        #[arg(long, default_value = "var/timecamp_users.json")]
        input: String,
    },
    /// Delete groups with no active users and no subgroups
    RemoveEmptyGroups {
        /// Log every intended deletion without issuing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the group hierarchy from the Target Document
    DisplayTree {
        /// Target Document to read
        #[arg(long, default_value = "var/timecamp_users.json")]
        file: String,
        /// Show the per-group user breakdown
        #[arg(long)]
        detailed: bool,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.debug, !cli.no_file_log);

    let result: Result<(), SyncError> = match cli.command {
        Commands::Prepare { dry_run, output } => storage_from_env()
            .and_then(|store| commands::prepare::run(store.as_ref(), &output, dry_run)),
        Commands::SyncUsers { dry_run, input } => storage_from_env()
            .and_then(|store| commands::sync_users::run(store.as_ref(), &input, dry_run)),
        Commands::RemoveEmptyGroups { dry_run } => commands::remove_empty_groups::run(dry_run),
        Commands::DisplayTree { file, detailed } => storage_from_env()
            .and_then(|store| commands::display_tree::run(store.as_ref(), &file, detailed)),
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
