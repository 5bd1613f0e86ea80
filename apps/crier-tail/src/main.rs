use clap::Parser;
use crier_tail::cli::Cli;
use crier_tail::client::{StreamClient, StreamSession};
use crier_tail::config::TailConfig;
use crier_tail::error::CliError;
use crier_tail::sink::HtmlPage;
use crier_tail::telemetry::logging;
use crier_tail::transport::websocket::WebSocketConnector;
use tokio::signal;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("crier-tail: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = TailConfig::try_from(cli)?;
    logging::init(&config.logging)?;

    let page = HtmlPage::new(&config.output).with_refresh_secs(config.page_refresh_secs);
    page.publish()?;

    info!(
        target: "crier::main",
        url = %config.endpoint,
        output = %page.path().display(),
        resume_from = %config.resume_from,
        reconnect_delay = ?config.reconnect_delay,
        replay_policy = ?config.replay_policy,
        "starting crier tail"
    );

    let session = StreamSession::new(config.session_options());
    let connector = WebSocketConnector::new(&config.endpoint);
    let mut client = StreamClient::new(connector, session, page.clone(), page);

    tokio::select! {
        _ = client.run() => {}
        _ = signal::ctrl_c() => {}
    }

    let session = client.session();
    let stats = session.stats();
    info!(
        target: "crier::main",
        last_message_id = %session.last_message_id(),
        events = stats.events_ingested,
        dropped = stats.frames_dropped,
        skipped = stats.replays_skipped,
        connections = stats.connections_opened,
        disconnects = stats.disconnects,
        "shutting down"
    );
    Ok(())
}
