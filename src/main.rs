use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use poem::http::StatusCode;
use poem::listener::TcpListener;
use poem::web::Data;
use poem::{EndpointExt, Route, Server, handler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vaultboot::config::Settings;
use vaultboot::error::BootstrapError;
use vaultboot::pipeline::{BootstrapOutcome, Bootstrapper, FailureStage};

#[derive(Parser, Debug)]
#[command(author, version, about = "Secret store bootstrap service")]
struct Args {
    /// Path to service configuration file (default: vaultboot.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[handler]
async fn initialize(Data(bootstrapper): Data<&Arc<Bootstrapper>>) -> (StatusCode, String) {
    info!("secrets bootstrap requested");

    let prepared = match bootstrapper.prepare().await {
        Ok(prepared) => prepared,
        Err(failure) => {
            // prepare already finalized the status flags when the record was
            // loaded; a record that was never found stays untouched.
            if failure.stage == FailureStage::BeforeRecord {
                warn!("secrets bootstrap rejected: {}", failure.error);
            } else {
                error!("secrets bootstrap failed before ack: {}", failure.error);
            }
            return error_response(&failure.error);
        }
    };

    // Reply early so the request won't time out while the init script runs;
    // from here on failures are recorded in the status flags only.
    let bootstrapper = Arc::clone(bootstrapper);
    tokio::spawn(async move {
        match bootstrapper.execute(prepared).await {
            BootstrapOutcome::Completed => {}
            BootstrapOutcome::Failed(err) => error!("secrets bootstrap failed: {err}"),
        }
    });

    (StatusCode::ACCEPTED, String::new())
}

fn error_response(error: &BootstrapError) -> (StatusCode, String) {
    let status = match error {
        BootstrapError::DataNotFound { .. } => StatusCode::NOT_FOUND,
        BootstrapError::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::new(args.config)?;
    settings.validate()?;

    let listen_addr: SocketAddr = settings.listen_addr.parse().map_err(|e| {
        anyhow::anyhow!("Failed to parse listen_addr {}: {e}", settings.listen_addr)
    })?;

    let bootstrapper = Arc::new(Bootstrapper::new(settings)?);

    let app = Route::new()
        .at("/secrets/initialize", poem::post(initialize))
        .data(bootstrapper);

    info!("Starting vaultboot on {listen_addr}");

    let mut server = tokio::spawn(Server::new(TcpListener::bind(listen_addr)).run(app));
    tokio::select! {
        result = &mut server => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!("Server failed: {err}"),
                Err(err) => error!("Server task failed: {err}"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Shutdown signal received");
        }
    }

    Ok(())
}
