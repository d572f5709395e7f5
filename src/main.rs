//! Rolesweep CLI Entry Point
//!
//! This is the main binary entry point for the Rolesweep CLI.
//! It provides four subcommands:
//! - `connect` - Connection profile management and validation
//! - `analyze` - Ownership and session analysis for one role
//! - `preview` - Read-only plan of what a deletion batch would do
//! - `run` - Execute a deletion batch
//!
//! All output to stdout is JSON-only. Logs go to stderr.

use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use rolesweep::config::{self, ConfigLocation};
use rolesweep::{
    BatchConfig, ConnectionConfig, DeletionEngine, ErrorEnvelope, Metadata, PgRoleStore,
    Result, RolesweepError, SuccessEnvelope,
};

/// Rolesweep - Ownership-Aware PostgreSQL Role Deletion
#[derive(Parser)]
#[command(name = "rolesweep")]
#[command(about = "Delete PostgreSQL roles safely, reassigning what they own")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage and test connection profiles
    Connect {
        #[command(subcommand)]
        action: ConnectAction,
    },

    /// Analyze one role's ownership and open sessions
    Analyze {
        /// Role to analyze
        role: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show what deleting the given roles would do, without doing it
    Preview {
        /// Roles to preview, in order
        #[arg(required = true)]
        roles: Vec<String>,

        /// Role receiving ownership of reassigned objects
        #[arg(long, default_value = "postgres")]
        reassign_to: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Delete the given roles
    Run {
        /// Roles to delete, in order
        #[arg(required = true)]
        roles: Vec<String>,

        /// Role receiving ownership of reassigned objects
        #[arg(long, default_value = "postgres")]
        reassign_to: String,

        /// Plan and report without executing anything
        #[arg(long)]
        dry_run: bool,

        /// Stop at the first role that fails
        #[arg(long)]
        stop_on_error: bool,

        /// Run the whole batch in one transaction (all or nothing)
        #[arg(long)]
        single_transaction: bool,

        /// Log only the batch summary, not each role
        #[arg(long)]
        no_log_details: bool,

        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Subcommand)]
enum ConnectAction {
    /// Save a connection profile (prompts for the password unless
    /// --password or --password-env is given)
    Save {
        /// Profile name
        #[arg(long)]
        name: String,

        /// Database host
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Database port
        #[arg(long, default_value_t = 5432)]
        port: u16,

        /// Database user
        #[arg(long)]
        user: String,

        /// Database name
        #[arg(long)]
        dbname: String,

        /// Password stored in the profile; skips the prompt
        #[arg(long, conflicts_with = "password_env")]
        password: Option<String>,

        /// Environment variable holding the password (stored instead of
        /// the password itself)
        #[arg(long)]
        password_env: Option<String>,

        /// Save to the global config instead of `.rolesweep/config.json`
        #[arg(long)]
        global: bool,
    },

    /// List saved profiles (passwords never shown)
    List,

    /// Remove a saved profile
    Remove {
        /// Profile name
        #[arg(long)]
        name: String,

        /// Remove from the global config instead of `.rolesweep/config.json`
        #[arg(long)]
        global: bool,
    },

    /// Open a connection and report server version, database, and user
    Test {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Where a database-facing command connects to
#[derive(Args)]
struct TargetArgs {
    /// Saved profile name (default profile when omitted)
    #[arg(long)]
    conn: Option<String>,

    /// Database host (overrides profiles; requires --user and --dbname)
    #[arg(long)]
    host: Option<String>,

    /// Database port
    #[arg(long, default_value_t = 5432)]
    port: u16,

    /// Database user
    #[arg(long)]
    user: Option<String>,

    /// Database name
    #[arg(long)]
    dbname: Option<String>,

    /// Environment variable holding the password
    #[arg(long)]
    password_env: Option<String>,
}

impl TargetArgs {
    /// Explicit flags win over profiles
    fn resolve(&self) -> Result<ConnectionConfig> {
        let Some(host) = &self.host else {
            return config::resolve_profile(self.conn.as_deref());
        };

        let user = self
            .user
            .clone()
            .ok_or_else(|| RolesweepError::config_error("--user is required with --host"))?;
        let dbname = self
            .dbname
            .clone()
            .ok_or_else(|| RolesweepError::config_error("--dbname is required with --host"))?;

        let password = match &self.password_env {
            Some(env_var) => Some(std::env::var(env_var).map_err(|_| {
                RolesweepError::config_error(format!(
                    "Environment variable {env_var} not found for password"
                ))
            })?),
            None => None,
        };

        Ok(ConnectionConfig::new(host.clone(), self.port, user, password, dbname))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Connect { action } => match action {
            ConnectAction::Save {
                name,
                host,
                port,
                user,
                dbname,
                password,
                password_env,
                global,
            } => connect_save(&name, host, port, user, dbname, password, password_env, global),
            ConnectAction::List => connect_list(),
            ConnectAction::Remove { name, global } => connect_remove(&name, global),
            ConnectAction::Test { target } => connect_test(&target).await,
        },
        Commands::Analyze { role, target } => analyze(&role, &target).await,
        Commands::Preview { roles, reassign_to, target } => {
            preview(&roles, reassign_to, &target).await
        }
        Commands::Run { roles, reassign_to, dry_run, stop_on_error, single_transaction, no_log_details, target } => {
            let batch_config = BatchConfig {
                reassign_to_user: reassign_to,
                dry_run,
                continue_on_error: !stop_on_error,
                transaction_per_role: !single_transaction,
                log_details: !no_log_details,
            };
            run_batch(&roles, &batch_config, &target).await
        }
    }
}

/// Logs go to stderr so stdout stays machine-parseable
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rolesweep=info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[allow(clippy::too_many_arguments)]
fn connect_save(
    name: &str,
    host: String,
    port: u16,
    user: String,
    dbname: String,
    password: Option<String>,
    password_env: Option<String>,
    global: bool,
) -> ExitCode {
    let password = if password.is_some() {
        password
    } else if password_env.is_some() {
        None
    } else {
        match dialoguer::Password::new()
            .with_prompt(format!("Password for {user}@{host}:{port}/{dbname}"))
            .allow_empty_password(true)
            .interact()
        {
            Ok(password) => Some(password),
            Err(e) => {
                let err = RolesweepError::config_error(format!("Could not read password: {e}"));
                return print_error("connect", "", &err);
            }
        }
    };

    let location = if global { ConfigLocation::Global } else { ConfigLocation::Local };
    let config = ConnectionConfig::new(host, port, user, password, dbname);

    match config::save_profile(name, config, password_env, location) {
        Ok(()) => print_success(
            "connect",
            "",
            &serde_json::json!({ "saved": name, "global": global }),
            Metadata::new(0),
        ),
        Err(e) => print_error("connect", "", &e),
    }
}

fn connect_list() -> ExitCode {
    match config::list_profiles() {
        Ok(profiles) => {
            let entries: Vec<_> = profiles
                .into_iter()
                .map(|(name, config, is_default)| {
                    serde_json::json!({
                        "name": name,
                        "host": config.host,
                        "port": config.port,
                        "user": config.user,
                        "dbname": config.dbname,
                        "default": is_default,
                    })
                })
                .collect();
            print_success("connect", "", &entries, Metadata::new(0))
        }
        Err(e) => print_error("connect", "", &e),
    }
}

fn connect_remove(name: &str, global: bool) -> ExitCode {
    let location = if global { ConfigLocation::Global } else { ConfigLocation::Local };

    match config::remove_profile(name, location) {
        Ok(removed) => print_success(
            "connect",
            "",
            &serde_json::json!({ "removed": removed, "name": name }),
            Metadata::new(0),
        ),
        Err(e) => print_error("connect", "", &e),
    }
}

async fn connect_test(target: &TargetArgs) -> ExitCode {
    let started = Instant::now();

    let (store, database) = match open_store(target).await {
        Ok(pair) => pair,
        Err(e) => return print_error("connect", "", &e),
    };

    match store.server_info().await {
        Ok(info) => print_success("connect", &database, &info, Metadata::new(elapsed_ms(started))),
        Err(e) => print_error("connect", &database, &e),
    }
}

async fn analyze(role: &str, target: &TargetArgs) -> ExitCode {
    let started = Instant::now();

    let (store, database) = match open_store(target).await {
        Ok(pair) => pair,
        Err(e) => return print_error("analyze", "", &e),
    };

    let engine = DeletionEngine::new(store);
    match engine.analyze(role).await {
        Ok(analysis) => {
            print_success("analyze", &database, &analysis, Metadata::new(elapsed_ms(started)))
        }
        Err(e) => print_error("analyze", &database, &e),
    }
}

async fn preview(roles: &[String], reassign_to: String, target: &TargetArgs) -> ExitCode {
    let started = Instant::now();

    let (store, database) = match open_store(target).await {
        Ok(pair) => pair,
        Err(e) => return print_error("preview", "", &e),
    };

    let engine = DeletionEngine::new(store);
    let batch_config = BatchConfig { reassign_to_user: reassign_to, ..BatchConfig::default() };
    let report = engine.preview(roles, &batch_config).await;

    print_success(
        "preview",
        &database,
        &report,
        Metadata::with_roles(elapsed_ms(started), report.entries.len()),
    )
}

async fn run_batch(roles: &[String], batch_config: &BatchConfig, target: &TargetArgs) -> ExitCode {
    let started = Instant::now();

    let (store, database) = match open_store(target).await {
        Ok(pair) => pair,
        Err(e) => return print_error("run", "", &e),
    };

    let engine = DeletionEngine::new(store);
    match engine.run(roles, batch_config).await {
        Ok(result) => {
            let aborted = result.aborted;
            let code = print_success(
                "run",
                &database,
                &result,
                Metadata::with_roles(elapsed_ms(started), result.outcomes.len()),
            );
            // An aborted batch still prints its result but exits nonzero
            if aborted {
                ExitCode::FAILURE
            } else {
                code
            }
        }
        Err(e) => print_error("run", &database, &e),
    }
}

async fn open_store(target: &TargetArgs) -> Result<(PgRoleStore, String)> {
    let config = target.resolve()?;
    let database = config.dbname.clone();
    let store = PgRoleStore::connect(&config).await?;
    Ok((store, database))
}

fn print_success<T: Serialize>(command: &str, database: &str, data: &T, meta: Metadata) -> ExitCode {
    let envelope = SuccessEnvelope::new(command, database, data, meta);
    match serde_json::to_string(&envelope) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize output: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_error(command: &str, database: &str, err: &RolesweepError) -> ExitCode {
    let envelope = ErrorEnvelope::from_error(command, database, err);
    match serde_json::to_string(&envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
    ExitCode::FAILURE
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
