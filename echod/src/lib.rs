pub mod config;
pub mod endpoints;
pub mod server;
pub mod store;

use error_stack::{Result, ResultExt};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::endpoints::AppState;
use crate::server::Server;
use crate::store::ItemStore;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load config, falling back on default")]
    LoadConfig,
    #[error("failed to set up the instance metadata client")]
    InstanceMetadata,
    #[error("failed to capture shutdown signals")]
    Signal,
    #[error("http server failed")]
    Server,
}

pub async fn run(cfg: Config) -> Result<(), Error> {
    let cancel = CancellationToken::new();
    listen_for_shutdown(cancel.clone())?;

    prepare_server(cfg)?.run(cancel).await.change_context(Error::Server)
}

fn prepare_server(cfg: Config) -> Result<Server, Error> {
    let service_tags = cfg.service_tags();
    let Config {
        bind_address,
        instance_metadata: metadata_config,
        ..
    } = cfg;

    info!(?metadata_config, "resolving machine address with instance metadata");
    let resolver =
        instance_metadata::resolver(metadata_config).change_context(Error::InstanceMetadata)?;

    let state = AppState::new(ItemStore::new(), resolver, service_tags);

    Ok(Server::new(bind_address, state))
}

fn listen_for_shutdown(cancel: CancellationToken) -> Result<(), Error> {
    let mut sigint = signal(SignalKind::interrupt()).change_context(Error::Signal)?;
    let mut sigterm = signal(SignalKind::terminate()).change_context(Error::Signal)?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {},
            _ = sigterm.recv() => {},
        }

        info!("signal received, waiting for program to exit gracefully");

        cancel.cancel();
    });

    Ok(())
}
