//! Server Configuration
//!
//! Command-line flags, each with a `LOGMETER_*` environment fallback:
//!
//! - `--port` / `LOGMETER_PORT`: HTTP port for the export server (default: 3903)
//! - `--bind` / `LOGMETER_BIND`: listen address (default: 0.0.0.0)
//! - `--logs` / `LOGMETER_LOGS`: comma-separated log files to tail
//! - `--progs` / `LOGMETER_PROGS`: directory of program files
//! - `--poll-interval-ms` / `LOGMETER_POLL_INTERVAL_MS`: tail poll interval (default: 250)
//! - `--log-json` / `LOGMETER_LOG_JSON`: emit JSON logs

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}: {reason}")]
    InvalidBind { value: String, reason: String },

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("program directory {} does not exist or is not a directory", .path.display())]
    ProgsNotADirectory { path: PathBuf },
}

/// Raw command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "logmeter",
    version,
    about = "Extract metrics from application logs"
)]
pub struct Cli {
    /// HTTP port to serve metrics on
    #[arg(long, env = "LOGMETER_PORT", default_value_t = 3903)]
    pub port: u16,

    /// Address to listen on
    #[arg(long, env = "LOGMETER_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Comma-separated list of log files to tail
    #[arg(long, env = "LOGMETER_LOGS", value_delimiter = ',')]
    pub logs: Vec<PathBuf>,

    /// Directory containing program files
    #[arg(long, env = "LOGMETER_PROGS")]
    pub progs: PathBuf,

    /// How often to poll log files for new lines
    #[arg(long, env = "LOGMETER_POLL_INTERVAL_MS", default_value_t = 250)]
    pub poll_interval_ms: u64,

    /// Emit logs as JSON
    #[arg(long, env = "LOGMETER_LOG_JSON")]
    pub log_json: bool,
}

/// Validated server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub logs: Vec<PathBuf>,
    pub progs: PathBuf,
    pub poll_interval: Duration,
    pub log_json: bool,
}

impl TryFrom<Cli> for ServerConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let ip: IpAddr = cli.bind.trim().parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidBind {
                value: cli.bind.clone(),
                reason: e.to_string(),
            }
        })?;

        if cli.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        if !cli.progs.is_dir() {
            return Err(ConfigError::ProgsNotADirectory { path: cli.progs });
        }

        Ok(Self {
            addr: SocketAddr::new(ip, cli.port),
            logs: cli.logs,
            progs: cli.progs,
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
            log_json: cli.log_json,
        })
    }
}

impl ServerConfig {
    /// Parse the process arguments and environment.
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(Cli::parse())
    }
}
