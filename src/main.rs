use std::{
    io::{self, BufRead, BufReader},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use sql_expand::{
    client_options::ClientOptions,
    config::Config,
    exec::DryRun,
    resolve::{ProcessSource, process_stdin},
    session::{Session, SessionError},
    template::ExpandError,
};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SQL_EXPAND_LOG";
/// Exit status when a template cannot be expanded.
const EXPAND_FAILED: u8 = 5;

#[derive(Parser)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = "Expand and run SQL statement templates",
    override_usage = "sql-expand [OPTIONS] [database] ['<sql-commands>'...]",
    after_help = "Statements may include $VAR, ${VAR}, $#VAR and $,VAR for lists, $@VAR for file contents and $- for stdin.",
    disable_help_flag = true
)]
struct Cli {
    /// Client option file (default ~/.my.cnf, or $SQL_CNF)
    #[arg(long)]
    sql_conf: Option<String>,

    #[arg(short = 'h', long)]
    sql_host: Option<String>,

    #[arg(long)]
    sql_port: Option<u16>,

    #[arg(short = 'u', long)]
    sql_user: Option<String>,

    #[arg(short = 'p', long)]
    sql_pass: Option<String>,

    #[arg(short = 'd', long)]
    sql_database: Option<String>,

    /// Log each statement as it runs
    #[arg(short = 'v', long)]
    debug: bool,

    /// Print the insert id after each change
    #[arg(short = 'i', long = "id")]
    report_id: bool,

    /// Print the number of affected rows after each change
    #[arg(short = 'c', long = "changes")]
    report_changes: bool,

    /// Fail updates and deletes that do not use a key
    #[arg(long)]
    safe: bool,

    /// Never enable safe updates
    #[arg(long = "unsafe")]
    unsafe_updates: bool,

    /// Count a change that touches no rows as a failure
    #[arg(short = 'C', long)]
    status_changes: bool,

    /// Run statements without $ expansion
    #[arg(short = 'x', long)]
    no_expand: bool,

    /// Run everything in one transaction
    #[arg(short = 't', long)]
    transaction: bool,

    /// Do not retry a statement that hit a deadlock
    #[arg(short = 'A', long)]
    abort_deadlock: bool,

    /// Pause briefly after each statement
    #[arg(long)]
    slow: bool,

    /// Run configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Database (unless -d is given), then statements. With no statements
    ///  each line of stdin is one.
    args: Vec<String>,
}

impl Cli {
    /// Config file values with the command-line switches turned on top.
    fn config(&self) -> Result<Config> {
        let mut config = Config::discover(self.config.as_deref()).context("loading configuration")?;
        config.no_expand |= self.no_expand;
        config.debug |= self.debug;
        config.safe |= self.safe;
        config.unsafe_updates |= self.unsafe_updates;
        config.transaction |= self.transaction;
        config.abort_deadlock |= self.abort_deadlock;
        config.report_id |= self.report_id;
        config.report_changes |= self.report_changes;
        config.status_changes |= self.status_changes;
        config.slow |= self.slow;
        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn run(cli: Cli, config: Config) -> Result<u32> {
    let mut statements = cli.args.into_iter();
    let database = match cli.sql_database {
        Some(database) => Some(database),
        None => statements.next(),
    };
    let options = ClientOptions {
        host: cli.sql_host,
        port: cli.sql_port,
        user: cli.sql_user,
        password: cli.sql_pass,
        database,
        ..ClientOptions::default()
    }
    .load(cli.sql_conf.as_deref())
    .context("reading client options")?;
    debug!(
        host = options.host().unwrap_or("localhost"),
        port = options.port,
        user = options.user.as_deref(),
        database = options.database.as_deref(),
        tls = options.use_tls(),
        "client options"
    );

    // Nothing here talks to a server: statements are printed
    let executor = DryRun::new(io::stdout());
    let mut session = Session::new(config, executor, ProcessSource::new(), io::stdout())?;
    session.begin()?;

    let statements: Vec<String> = statements.collect();
    if statements.is_empty() {
        if let Some(stdin) = process_stdin().claim() {
            for line in BufReader::new(stdin).lines() {
                let line = line.context("reading stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                session.run(&line)?;
            }
        }
    } else {
        for statement in &statements {
            session.run(statement)?;
        }
    }

    Ok(session.finish()?)
}

fn exit_status(e: &anyhow::Error) -> u8 {
    let expand = e.downcast_ref::<ExpandError>().is_some()
        || matches!(e.downcast_ref::<SessionError>(), Some(SessionError::Expand(_)));
    if expand { EXPAND_FAILED } else { 1 }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    init_logging(cli.debug || config.as_ref().is_ok_and(|c| c.debug));

    match config.and_then(|config| run(cli, config)) {
        Ok(failures) => ExitCode::from(u8::try_from(failures).unwrap_or(u8::MAX)),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}
