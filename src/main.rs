//! # Batch Desk CLI (`bdesk`)
//!
//! The `bdesk` binary is the operator interface for Batch Desk. It covers
//! what the dashboard's import modal, batch management tab and assistant
//! panel do.
//!
//! ## Usage
//!
//! ```bash
//! bdesk --config ./config/bdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bdesk init` | Create the SQLite database |
//! | `bdesk validate <file> --type qced` | Preview and validate a CSV |
//! | `bdesk import <file> --type fresh` | Validate and store a CSV as a new batch |
//! | `bdesk batches` | List batches |
//! | `bdesk jobs <batch>` | Filtered, paginated job table |
//! | `bdesk assign <batch> <job>... --to <email>` | Bulk assign |
//! | `bdesk stats [<batch>]` | Status overview |
//! | `bdesk export <batch>` | Export jobs as CSV |
//! | `bdesk ask "<command>"` | One assistant command |
//! | `bdesk chat` | Assistant session on stdin |
//!
//! ## Examples
//!
//! ```bash
//! bdesk import ./uploads/week3.csv --type fresh --name "Week 3"
//! bdesk jobs batch-3 --status pending --page 2
//! bdesk ask "How many pending jobs in Batch-1?"
//! ```

use batch_desk::config::{self, Config};
use batch_desk::import::ImportArgs;
use batch_desk::progress::ProgressMode;
use batch_desk::{assistant, batches, export, import, logging, migrate, stats};
use batch_desk_core::models::DataType;
use batch_desk_core::query::JobQuery;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Batch Desk CLI — CSV import, validation and batch tracking for
/// annotation/QC workflows.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/bdesk.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "bdesk",
    about = "Batch Desk — CSV import, validation and batch tracking for annotation/QC workflows",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bdesk.toml")]
    config: PathBuf,

    /// Log progress of library operations (`info` level) to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Progress output on stderr. Defaults to `human` on a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the blob table. Idempotent.
    Init,

    /// Validate a CSV file without importing it.
    ///
    /// Prints a preview of the first rows and every validation error.
    /// Works without a config file.
    Validate {
        /// Path to the `.csv` file.
        file: PathBuf,

        /// Schema to validate against: `fresh` or `qced`.
        #[arg(long = "type", value_parser = parse_data_type)]
        data_type: DataType,
    },

    /// Validate a CSV file and store it as a new batch.
    Import {
        /// Path to the `.csv` file.
        file: PathBuf,

        /// Schema to validate against: `fresh` or `qced`.
        #[arg(long = "type", value_parser = parse_data_type)]
        data_type: DataType,

        /// Batch name. Defaults to the minted `Batch-<n>` label.
        #[arg(long)]
        name: Option<String>,

        /// Uploader recorded on the batch. Defaults to `import.uploaded_by`.
        #[arg(long)]
        uploaded_by: Option<String>,

        /// Validate and report without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// List all batches, demonstration batches first.
    Batches,

    /// Show the jobs of one batch.
    Jobs {
        /// Batch id (e.g. `batch-3`, case-insensitive).
        batch: String,

        /// Case-insensitive text matched against every column.
        #[arg(long)]
        search: Option<String>,

        /// Exact `data_status` value.
        #[arg(long)]
        status: Option<String>,

        /// Exact `assigned_to` value.
        #[arg(long)]
        assignee: Option<String>,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Assign jobs of one batch to someone.
    Assign {
        /// Batch id.
        batch: String,

        /// Job ids to assign.
        #[arg(required = true)]
        jobs: Vec<String>,

        /// Assignee email.
        #[arg(long)]
        to: String,

        /// Name recorded in `assigned_by`. Defaults to `import.uploaded_by`.
        #[arg(long)]
        by: Option<String>,
    },

    /// Job counts per status for one batch, or `all`.
    Stats {
        /// Batch id. Omit for every batch.
        batch: Option<String>,
    },

    /// Export a batch's jobs as CSV.
    Export {
        /// Batch id.
        batch: String,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run one assistant command, e.g. "Show rejected jobs in Batch-2".
    Ask {
        /// The command text.
        text: String,
    },

    /// Interactive assistant session reading commands from stdin.
    Chat,

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

fn parse_data_type(s: &str) -> Result<DataType, String> {
    s.parse::<DataType>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    // Commands that don't require config
    match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "bdesk", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Validate { file, data_type } => {
            // Use config if available, otherwise a minimal default
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| Config::minimal());
            import::run_validate(&cfg, file, *data_type)?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import {
            file,
            data_type,
            name,
            uploaded_by,
            dry_run,
        } => {
            let args = ImportArgs {
                file,
                data_type,
                name,
                uploaded_by,
                dry_run,
            };
            import::run_import(&cfg, args, progress.as_ref()).await?;
        }
        Commands::Batches => {
            batches::run_batches(&cfg).await?;
        }
        Commands::Jobs {
            batch,
            search,
            status,
            assignee,
            page,
        } => {
            let query = JobQuery {
                search,
                status,
                assignee,
            };
            batches::run_jobs(&cfg, &batch, &query, page).await?;
        }
        Commands::Assign {
            batch,
            jobs,
            to,
            by,
        } => {
            batches::run_assign(&cfg, &batch, &jobs, &to, by.as_deref()).await?;
        }
        Commands::Stats { batch } => {
            stats::run_stats(&cfg, batch.as_deref()).await?;
        }
        Commands::Export { batch, output } => {
            export::run_export(&cfg, &batch, output.as_deref()).await?;
        }
        Commands::Ask { text } => {
            assistant::run_ask(&cfg, &text, progress.as_ref()).await?;
        }
        Commands::Chat => {
            assistant::run_chat(&cfg, progress.as_ref()).await?;
        }
        Commands::Completions { .. } | Commands::Validate { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
