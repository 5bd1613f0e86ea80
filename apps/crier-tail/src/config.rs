use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::client::{ReplayPolicy, SessionOptions};
use crate::error::CliError;
use crate::event::EventId;
use crate::render::Renderer;
use crate::telemetry::logging::LogConfig;
use crate::transport::websocket::WebSocketConfig;
use url::Url;

/// Validated runtime settings for one tail session.
#[derive(Debug, Clone)]
pub struct TailConfig {
    pub endpoint: Url,
    pub output: PathBuf,
    pub page_refresh_secs: u32,
    pub resume_from: EventId,
    pub reconnect_delay: Duration,
    pub replay_policy: ReplayPolicy,
    pub message_base: Option<String>,
    pub logging: LogConfig,
}

impl TailConfig {
    pub fn session_options(&self) -> SessionOptions {
        let renderer = match &self.message_base {
            Some(base) => Renderer::new().with_message_base(base.clone()),
            None => Renderer::new(),
        };
        SessionOptions {
            resume_from: self.resume_from.clone(),
            reconnect_delay: self.reconnect_delay,
            replay_policy: self.replay_policy,
            renderer,
        }
    }
}

impl TryFrom<Cli> for TailConfig {
    type Error = CliError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let mut endpoint = WebSocketConfig::new(cli.url.trim());
        if let Some(path) = cli.path.filter(|path| !path.trim().is_empty()) {
            endpoint = endpoint.with_path(path);
        }
        let endpoint = endpoint
            .build_url()
            .map_err(|source| CliError::InvalidUrl {
                url: cli.url.clone(),
                source,
            })?;

        let resume_from = cli.resume_from.trim();
        if resume_from.is_empty() {
            return Err(CliError::InvalidArgument(
                "--resume-from must not be empty".into(),
            ));
        }
        if cli.reconnect_delay_ms == 0 {
            return Err(CliError::InvalidArgument(
                "--reconnect-delay-ms must be greater than zero".into(),
            ));
        }

        Ok(TailConfig {
            endpoint,
            output: cli.output,
            page_refresh_secs: cli.page_refresh_secs,
            resume_from: EventId::new(resume_from),
            reconnect_delay: Duration::from_millis(cli.reconnect_delay_ms),
            replay_policy: if cli.skip_replayed {
                ReplayPolicy::SkipReplayed
            } else {
                ReplayPolicy::RenderAll
            },
            message_base: cli.message_base.filter(|base| !base.trim().is_empty()),
            logging: cli.logging.to_config(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Result<TailConfig, CliError> {
        let mut argv = vec!["crier-tail"];
        argv.extend_from_slice(args);
        TailConfig::try_from(Cli::try_parse_from(argv).expect("cli parse"))
    }

    #[test]
    fn bare_address_gets_path_and_scheme() {
        let config = parse(&["--url", "127.0.0.1:8000", "--path", "/ws"]).expect("config");
        assert_eq!(config.endpoint.as_str(), "ws://127.0.0.1:8000/ws");
    }

    #[test]
    fn remote_endpoint_keeps_localhost_outside_the_host() {
        let config = parse(&["--url", "crier.example.net:8000/ws?tag=localhost"]).expect("config");
        assert_eq!(
            config.endpoint.as_str(),
            "wss://crier.example.net:8000/ws?tag=localhost"
        );
    }

    #[test]
    fn skip_replayed_selects_policy_and_delay_converts() {
        let config = parse(&[
            "--url",
            "ws://localhost:8000/ws",
            "--skip-replayed",
            "--reconnect-delay-ms",
            "1500",
        ])
        .expect("config");
        assert_eq!(config.replay_policy, ReplayPolicy::SkipReplayed);
        assert_eq!(config.reconnect_delay, Duration::from_millis(1500));
        let options = config.session_options();
        assert_eq!(options.reconnect_delay, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_blank_cursor_and_zero_delay() {
        let err = parse(&["--url", "ws://localhost:8000/ws", "--resume-from", " "]).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
        let err = parse(&["--url", "ws://localhost:8000/ws", "--reconnect-delay-ms", "0"])
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        let err = parse(&["--url", "ws://[::1"]).unwrap_err();
        assert!(matches!(err, CliError::InvalidUrl { .. }));
    }
}
