//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, health), and their associated
//! argument structs. Every `run` flag has an environment variable
//! equivalent for container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "hopper",
    version,
    about = "HTTP fan-out gateway",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        hopper init                     Create a starter config\n  \
        hopper run                      Start with ./hopper.yaml\n  \
        hopper run -c fanout.yaml       Start with a specific config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        hopper run                                   Auto-detect config\n  \
        hopper run -c fanout.yaml                    Specific config file\n  \
        hopper run -c fanout.yaml -p 8080 --pretty   Local dev mode\n  \
        hopper run --timeout 0                       Wait for destinations indefinitely")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // -- Directory --
    /// `MongoDB` connection URL (destinations are read from Mongo instead of the config file)
    #[cfg(feature = "mongodb")]
    #[arg(long, env = "MONGODB_URL", help_heading = "Directory")]
    pub mongodb_url: Option<String>,

    /// `MongoDB` database holding the `destinations` collection
    #[cfg(feature = "mongodb")]
    #[arg(
        long,
        env = "MONGODB_DATABASE",
        default_value = "hopper",
        help_heading = "Directory"
    )]
    pub mongodb_database: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Per-destination replay timeout in milliseconds, 0 to disable (overrides config)
    #[arg(long, env = "REQUEST_TIMEOUT_MS", help_heading = "Tuning")]
    pub timeout: Option<u64>,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,

    /// Lines buffered per observer before lines are dropped for it (overrides config)
    #[arg(long, env = "BROADCAST_QUEUE", help_heading = "Tuning")]
    pub broadcast_queue: Option<usize>,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        hopper init                          Quick start config (yaml)\n  \
        hopper init --full                   Every option, documented\n  \
        hopper init -f toml -o fanout.toml   TOML format")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include full documentation as comments
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "hopper.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_overrides_are_optional() {
        let cli = Cli::try_parse_from(["hopper", "run", "--port", "8080"]).unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.port, 8080);
        assert!(args.broadcast_queue.is_none());
        assert_eq!(args.max_body, 1_048_576);
    }

    #[test]
    fn zero_timeout_parses() {
        let cli = Cli::try_parse_from(["hopper", "run", "--timeout", "0"]).unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.timeout, Some(0));
    }
}
