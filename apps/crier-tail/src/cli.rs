use clap::{Args, Parser};
use std::path::PathBuf;

use crate::event::RESUME_FROM_START;
use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "crier-tail",
    about = "Follow a crier event stream and render it grouped by host",
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), "-", env!("CRIER_BUILD_TIMESTAMP"))
)]
pub struct Cli {
    #[arg(
        long,
        env = "CRIER_URL",
        default_value = "ws://localhost:8000/ws",
        help = "WebSocket endpoint of the crier dashboard (ws://, wss:// or bare host:port)"
    )]
    pub url: String,

    #[arg(
        long,
        env = "CRIER_PATH",
        value_name = "PATH",
        help = "Path appended to --url, e.g. /ws when --url is a bare address"
    )]
    pub path: Option<String>,

    #[arg(
        long,
        short = 'o',
        env = "CRIER_OUTPUT",
        default_value = "crier.html",
        value_name = "FILE",
        help = "HTML page rewritten on every update"
    )]
    pub output: PathBuf,

    #[arg(
        long,
        env = "CRIER_RESUME_FROM",
        default_value = RESUME_FROM_START,
        value_name = "ID",
        help = "Stream id to resume after on the first connection"
    )]
    pub resume_from: String,

    #[arg(
        long,
        env = "CRIER_RECONNECT_DELAY_MS",
        default_value_t = 3_000,
        value_name = "MS",
        help = "Fixed delay between losing the connection and the next attempt"
    )]
    pub reconnect_delay_ms: u64,

    #[arg(
        long,
        env = "CRIER_SKIP_REPLAYED",
        help = "Drop events whose id is not after the resume cursor"
    )]
    pub skip_replayed: bool,

    #[arg(
        long,
        env = "CRIER_MESSAGE_BASE",
        value_name = "URL",
        help = "Dashboard base URL; ids link to <URL>/message/<id> for the full text"
    )]
    pub message_base: Option<String>,

    #[arg(
        long,
        env = "CRIER_PAGE_REFRESH_SECS",
        default_value_t = 2,
        value_name = "SECS",
        help = "Auto-refresh interval written into the HTML page"
    )]
    pub page_refresh_secs: u32,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "CRIER_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "CRIER_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}
