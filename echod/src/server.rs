use std::net::SocketAddr;

use axum::Router;
use error_stack::{Result, ResultExt};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::endpoints::{self, AppState};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to start the http server")]
    Start,
    #[error("http server failed while running")]
    WhileRunning,
    #[error("failed to check server bind address")]
    SocketAddr,
}

/// TCP connection abstraction for the http server
///
/// The server either binds the configured address itself or takes over a listener
/// that is already bound, which lets tests run on OS-assigned ports.
pub enum TcpConnector {
    Address(SocketAddr),
    Listener(TcpListener),
}

impl TcpConnector {
    pub async fn connect(self) -> Result<TcpListener, Error> {
        match self {
            TcpConnector::Address(addr) => {
                TcpListener::bind(addr).await.change_context(Error::Start)
            }
            TcpConnector::Listener(listener) => Ok(listener),
        }
    }

    pub fn bind_address(&self) -> Result<SocketAddr, Error> {
        match self {
            TcpConnector::Address(addr) => Ok(*addr),
            TcpConnector::Listener(listener) => {
                listener.local_addr().change_context(Error::SocketAddr)
            }
        }
    }
}

impl From<SocketAddr> for TcpConnector {
    fn from(addr: SocketAddr) -> Self {
        TcpConnector::Address(addr)
    }
}

impl From<TcpListener> for TcpConnector {
    fn from(listener: TcpListener) -> Self {
        TcpConnector::Listener(listener)
    }
}

pub struct Server {
    tcp_connector: TcpConnector,
    router: Router,
}

impl Server {
    pub fn new(tcp_connector: impl Into<TcpConnector>, state: AppState) -> Self {
        Self {
            tcp_connector: tcp_connector.into(),
            router: endpoints::create_router(state),
        }
    }

    /// Serves requests until the token is cancelled, then finishes in-flight requests
    pub async fn run(self, cancel: CancellationToken) -> Result<(), Error> {
        let address = self.tcp_connector.bind_address()?;
        let listener = self
            .tcp_connector
            .connect()
            .await
            .attach_printable(address)?;

        info!(address = address.to_string(), "starting http server");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                info!("shutting down http server")
            })
            .await
            .change_context(Error::WhileRunning)
    }
}
