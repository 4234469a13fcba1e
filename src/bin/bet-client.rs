//! Agency client entry point.
//!
//! Loads the configuration, opens the agency CSV and runs one session.
//! SIGTERM and Ctrl-C cancel the session gracefully.
//!
//! Exit codes: 0 on completion or interruption, 1 on any error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use bet_client::config::parse_duration;
use bet_client::{ClientConfig, CsvRecordProvider, ProtocolRevision, Session, SessionOutcome};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bet-client")]
#[command(version)]
#[command(about = "Upload agency bets to the lottery collector", long_about = None)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Agency identifier.
    #[arg(long)]
    id: Option<String>,

    /// Collector address (host:port).
    #[arg(long)]
    server: Option<String>,

    /// Agency CSV file.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Pause between batches, e.g. 500ms or 5s.
    #[arg(long, value_parser = parse_period)]
    period: Option<Duration>,

    /// Maximum bets per batch.
    #[arg(long)]
    batch_max_amount: Option<usize>,

    /// Batch header revision (v1, v2, v3).
    #[arg(long)]
    protocol: Option<ProtocolRevision>,
}

fn parse_period(text: &str) -> Result<Duration, String> {
    parse_duration(text).map_err(|e| e.to_string())
}

impl Cli {
    fn apply(self, config: &mut ClientConfig) {
        if let Some(id) = self.id {
            config.id = id;
        }
        if let Some(server) = self.server {
            config.server_address = server;
        }
        if let Some(data) = self.data {
            config.data_path = data;
        }
        if let Some(period) = self.period {
            config.loop_period = period;
        }
        if let Some(amount) = self.batch_max_amount {
            config.batch_max_amount = amount;
        }
        if let Some(protocol) = self.protocol {
            config.protocol_revision = protocol;
        }
    }
}

fn load_config(cli: Cli) -> bet_client::Result<ClientConfig> {
    let path = cli.config.exists().then(|| cli.config.clone());
    let mut config = ClientConfig::read(path.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Cancel `token` on SIGTERM or Ctrl-C.
fn spawn_signal_watch(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::error!("Cannot install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("action: signal | result: success | signal: SIGINT");
            }
            _ = terminate => {
                tracing::info!("action: signal | result: success | signal: SIGTERM");
            }
        }
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            tracing::error!(critical = true, "action: config | result: fail | error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_level);

    tracing::info!(
        "action: config | result: success | client_id: {} | server_address: {} | \
         loop_period: {:?} | batch_max_amount: {} | max_frame_bytes: {} | log_level: {}",
        config.id,
        config.server_address,
        config.loop_period,
        config.batch_max_amount,
        config.max_frame_bytes,
        config.log_level,
    );

    let provider = match CsvRecordProvider::open(config.id.clone(), &config.data_path) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!(
                critical = true,
                "action: open_bets | result: fail | client_id: {} | error: {}",
                config.id,
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    spawn_signal_watch(cancel.clone());

    let mut session = Session::builder(config).cancel_token(cancel).build();
    match session.run(provider).await {
        Ok(SessionOutcome::Completed(_)) | Ok(SessionOutcome::Interrupted) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
