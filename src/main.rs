//! voicegate - main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::EnvFilter;

use voicegate::{
    cli::{Cli, Command},
    config::Config,
    error::{ConfigError, ServiceError},
    service::{start_server, ControlState},
    store::RpcStoreConnector,
    sync::{FileAttributeSource, SyncAgent},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voicegate=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(config).await,
        Command::Sync => run_sync(config).await,
    }
}

async fn run_serve(config: Config) -> anyhow::Result<()> {
    let secret = config.control.secret.clone().unwrap_or_else(|| {
        use rand::Rng;
        let generated: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        tracing::info!("CONTROL_SECRET not set, generated for this run: {}", generated);
        SecretString::from(generated)
    });

    let connector = Arc::new(RpcStoreConnector::new(config.store.clone()));
    let state = Arc::new(ControlState::new(connector, secret.expose_secret()));

    let addr: SocketAddr = format!("{}:{}", config.control.host, config.control.port)
        .parse()
        .map_err(|e| ServiceError::StartupFailed {
            reason: format!(
                "invalid address '{}:{}': {}",
                config.control.host, config.control.port, e
            ),
        })?;

    let (bound_addr, shutdown_tx) = start_server(addr, state).await?;

    tracing::info!("Control service listening on http://{}", bound_addr);
    tracing::info!(
        "Create: http://{}/<secret>/CREATE_CHANNEL/MyChannel/MySubChannel",
        bound_addr
    );
    tracing::info!(
        "Remove: http://{}/<secret>/REMOVE_CHANNEL/MyChannel/MySubChannel",
        bound_addr
    );
    tracing::info!(
        "Voice-server bridge at {}:{}",
        config.store.host,
        config.store.port
    );

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    Ok(())
}

async fn run_sync(config: Config) -> anyhow::Result<()> {
    let sync = config.sync;

    let secret = sync.secret.clone().ok_or_else(|| ConfigError::MissingRequired {
        key: "SYNC_SECRET".to_string(),
        hint: "set SYNC_SECRET (or CONTROL_SECRET) to the control service's shared secret"
            .to_string(),
    })?;
    let attribute_file = sync
        .attribute_file
        .clone()
        .ok_or_else(|| ConfigError::MissingRequired {
            key: "SYNC_ATTRIBUTE_FILE".to_string(),
            hint: "point SYNC_ATTRIBUTE_FILE at the file the world server writes the desired \
                   channel id to"
                .to_string(),
        })?;

    let source = Arc::new(FileAttributeSource::new(attribute_file));
    let mut agent = SyncAgent::new(
        sync.create_base_url(&secret),
        sync.remove_base_url(&secret),
        sync.interval,
        source,
    );

    tracing::info!(
        interval_ms = sync.interval.as_millis() as u64,
        control_url = %sync.control_url,
        "Sync agent started"
    );

    tokio::select! {
        _ = agent.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down sync agent");
        }
    }
    agent.destroy().await;
    Ok(())
}
