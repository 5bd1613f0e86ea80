use thiserror::Error;

use crate::sink::SinkError;
use crate::telemetry::logging::InitError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid endpoint '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("logging initialization failed: {0}")]
    Logging(#[from] InitError),
    #[error("output page error: {0}")]
    Output(#[from] SinkError),
}
