//! Operator CLI for a WorkLedger database.
//!
//! # Responsibility
//! - Initialize/migrate a database file.
//! - Administer authorities and global users.
//!
//! Tenant data itself is managed through the API layer, not here.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;
use workledger_core::db::migrations::current_user_version;
use workledger_core::model::staff::UserDraft;
use workledger_core::model::validation::parse_date;
use workledger_core::{
    default_log_level, init_logging, open_db, AuthorityService, SqliteAuthorityRepository,
    SqliteUserRepository, UserRepository,
};

#[derive(Parser, Debug)]
#[command(name = "workledger", about = "WorkLedger database administration", version)]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "WORKLEDGER_DB", default_value = "workledger.sqlite3")]
    db: PathBuf,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "WORKLEDGER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; logging is off when unset.
    #[arg(long, global = true, env = "WORKLEDGER_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or migrate the database and print its schema version
    Init,

    /// Authority registry
    #[command(subcommand)]
    Authority(AuthorityCommand),

    /// Global user identities
    #[command(subcommand)]
    User(UserCommand),

    /// Print the core version
    Version,
}

#[derive(Subcommand, Debug)]
enum AuthorityCommand {
    /// Register a new authority
    Create {
        /// Last valid day, YYYY-MM-DD
        #[arg(long, value_parser = parse_expiry)]
        expires: NaiveDate,

        /// Register as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// Show one authority
    Show { id: Uuid },

    /// List all authorities
    List,

    /// Delete an authority and every record it owns
    Delete { id: Uuid },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Register a user
    Create {
        username: String,

        #[arg(long)]
        project_manager: bool,
    },
}

fn parse_expiry(value: &str) -> Result<NaiveDate, String> {
    parse_date("expires", value).map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    if let Command::Version = cli.command {
        println!("workledger {}", workledger_core::core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db)?;
    info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.command)
    );

    match cli.command {
        Command::Init => {
            println!(
                "{} schema_version={}",
                cli.db.display(),
                current_user_version(&conn)?
            );
        }
        Command::Authority(command) => {
            let authorities = AuthorityService::new(SqliteAuthorityRepository::try_new(&conn)?);
            match command {
                AuthorityCommand::Create { expires, inactive } => {
                    let authority = authorities.register(expires, !inactive)?;
                    println!("{}", authority.uuid);
                }
                AuthorityCommand::Show { id } => {
                    let authority = authorities.get(id)?;
                    println!(
                        "{} expires_at={} active={}",
                        authority.uuid, authority.expires_at, authority.is_active
                    );
                }
                AuthorityCommand::List => {
                    for authority in authorities.list()? {
                        println!(
                            "{} expires_at={} active={}",
                            authority.uuid, authority.expires_at, authority.is_active
                        );
                    }
                }
                AuthorityCommand::Delete { id } => {
                    let report = authorities.remove(id)?;
                    println!(
                        "deleted {} rows, nullified {} references",
                        report.total_deleted(),
                        report.nullified
                    );
                }
            }
        }
        Command::User(UserCommand::Create {
            username,
            project_manager,
        }) => {
            let users = SqliteUserRepository::try_new(&conn)?;
            let mut draft = UserDraft::new(username);
            draft.is_project_manager = project_manager;
            println!("{}", users.create_user(&draft)?.uuid);
        }
        Command::Version => {}
    }
    Ok(())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Init => "init",
        Command::Authority(AuthorityCommand::Create { .. }) => "authority_create",
        Command::Authority(AuthorityCommand::Show { .. }) => "authority_show",
        Command::Authority(AuthorityCommand::List) => "authority_list",
        Command::Authority(AuthorityCommand::Delete { .. }) => "authority_delete",
        Command::User(UserCommand::Create { .. }) => "user_create",
        Command::Version => "version",
    }
}
