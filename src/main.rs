use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use lotadmin::cli::{self, OutputFormat, lots::ListArgs};
use lotadmin::query::{SortField, SortOrder};

#[derive(Debug, Parser)]
#[command(name = "lotadmin")]
#[command(about = "Admin console for uploaded lot files and merchant API tokens")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in and save the session to ~/.lotadmin/session.json
    Login {
        #[arg(long, short)]
        username: String,
        /// Read from stdin when omitted
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show the saved session
    Whoami,
    /// Show dashboard totals
    Stats {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Browse, download and delete uploaded lots
    Lots {
        #[command(subcommand)]
        action: LotsAction,
    },
    /// Manage merchant upload tokens
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
    /// Show recent entries from the activity log
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage lotadmin configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum LotsAction {
    /// List one page of lots
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        /// Lots per page (1-100)
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        lot_number: Option<String>,
        #[arg(long)]
        file_name: Option<String>,
        #[arg(long)]
        uploaded_by: Option<String>,
        /// Uploaded on or after (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Uploaded on or before (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// uploaded_at, lot_number, file_name or record_count
        #[arg(long)]
        sort_by: Option<SortField>,
        /// asc or desc
        #[arg(long)]
        order: Option<SortOrder>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Download lot CSVs, one at a time
    Download {
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Target directory (default: [lots] download_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Pause between downloads in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Delete lots
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum TokensAction {
    /// List tokens with secrets masked
    List {
        /// Show these token IDs in cleartext
        #[arg(long, num_args = 1..)]
        reveal: Vec<i64>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Generate a token for a merchant
    Create {
        name: String,
        /// Do not copy the new token to the clipboard
        #[arg(long)]
        no_copy: bool,
    },
    /// Activate or deactivate a token
    Toggle { id: i64 },
    /// Delete a token
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Copy a token to the clipboard
    Copy { id: i64 },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Create a default config file at ~/.lotadmin/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value (e.g. `lotadmin config set lots.page_size 100`)
    Set {
        /// Dotted key path (e.g. api.base_url, lots.bulk_delay_ms)
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset configuration to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Login { username, password } => cli::run_login(&username, password),
        Commands::Logout => cli::run_logout(),
        Commands::Whoami => cli::run_whoami(),
        Commands::Stats { format } => cli::run_stats(OutputFormat::from_str_opt(Some(&format))),
        Commands::Lots { action } => match action {
            LotsAction::List {
                page,
                limit,
                lot_number,
                file_name,
                uploaded_by,
                from,
                to,
                sort_by,
                order,
                format,
            } => {
                let args = ListArgs {
                    page,
                    limit,
                    lot_number,
                    file_name,
                    uploaded_by,
                    from,
                    to,
                    sort_by,
                    order,
                };
                cli::lots::run_list(args, OutputFormat::from_str_opt(Some(&format)))
            }
            LotsAction::Download { ids, dir, delay_ms } => {
                cli::lots::run_download(&ids, dir, delay_ms)
            }
            LotsAction::Delete { ids, yes } => cli::lots::run_delete(&ids, yes),
        },
        Commands::Tokens { action } => match action {
            TokensAction::List { reveal, format } => {
                cli::tokens::run_list(&reveal, OutputFormat::from_str_opt(Some(&format)))
            }
            TokensAction::Create { name, no_copy } => cli::tokens::run_create(&name, no_copy),
            TokensAction::Toggle { id } => cli::tokens::run_toggle(id),
            TokensAction::Delete { id, yes } => cli::tokens::run_delete(id, yes),
            TokensAction::Copy { id } => cli::tokens::run_copy(id),
        },
        Commands::History { limit, format } => {
            cli::run_history(limit, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
