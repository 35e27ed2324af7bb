use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "mimic", version, about = "mysql-mimic CLI")]
struct Cli {
    /// Log filter (e.g. `debug`, `mimic_sql=trace`). Overrides RUST_LOG.
    #[arg(long, global = true, env = "MIMIC_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a configuration file and report what the virtual INFORMATION_SCHEMA will hold.
    Check {
        /// Path to the configuration file
        #[arg(long, short = 'c', default_value = "mimic.yaml")]
        config: PathBuf,
    },

    /// Run statements through the interception pipeline against an echo backend.
    Run {
        /// Path to the configuration file. Defaults apply when omitted.
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Database to select for the connection
        #[arg(long, short = 'D')]
        database: Option<String>,

        /// User to connect as (defaults to `server.default_user`)
        #[arg(long, short = 'u')]
        user: Option<String>,

        /// SQL to run; each argument may hold several `;`-separated statements
        #[arg(required = true)]
        sql: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Check { config } => commands::check::run(&config)?,

        Command::Run {
            config,
            database,
            user,
            sql,
        } => {
            commands::run::run(
                config.as_deref(),
                database.as_deref(),
                user.as_deref(),
                &sql,
            )
            .await?
        }
    }

    Ok(())
}
