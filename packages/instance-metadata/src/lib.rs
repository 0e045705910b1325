//! Client for the cloud instance metadata service
//!
//! The host's private address is resolved through one of several interchangeable
//! strategies, all exposed through the [`Resolver`] trait:
//!
//! - [`TokenGatedClient`]: acquires a short-lived session token, then presents it
//!   to read the address (instance metadata v2)
//! - [`UnauthenticatedClient`]: a single unauthenticated read (instance metadata v1)
//! - [`Disabled`]: never contacts the network, for hosts outside the cloud
//!
//! Resolvers never fail. Any timeout, transport error or non-success response is
//! logged and reported as [`MachineAddress::Unknown`].

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use error_stack::Result;
use mockall::automock;

mod config;
mod error;
mod http;
mod token_gated;
mod unauthenticated;

pub use config::Config;
pub use error::Error;
pub use token_gated::TokenGatedClient;
pub use unauthenticated::UnauthenticatedClient;

/// Displayed in place of an address that could not be resolved
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineAddress {
    Resolved(String),
    Unknown,
}

impl MachineAddress {
    pub fn is_resolved(&self) -> bool {
        matches!(self, MachineAddress::Resolved(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            MachineAddress::Resolved(address) => address,
            MachineAddress::Unknown => UNKNOWN,
        }
    }
}

impl Display for MachineAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Option<String>> for MachineAddress {
    fn from(address: Option<String>) -> Self {
        address.map_or(MachineAddress::Unknown, MachineAddress::Resolved)
    }
}

#[automock]
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves the private network address of the host this process runs on
    async fn fetch_machine_address(&self) -> MachineAddress;
}

/// Resolver for environments without a metadata service
#[derive(Debug, Default, Clone, Copy)]
pub struct Disabled;

#[async_trait]
impl Resolver for Disabled {
    async fn fetch_machine_address(&self) -> MachineAddress {
        MachineAddress::Unknown
    }
}

/// Builds the resolver strategy selected by the config
pub fn resolver(config: Config) -> Result<Box<dyn Resolver>, Error> {
    match config {
        Config::TokenGated {
            base_url,
            timeout,
            token_ttl,
        } => Ok(Box::new(TokenGatedClient::new(
            &base_url, timeout, token_ttl,
        )?)),
        Config::Unauthenticated { base_url, timeout } => {
            Ok(Box::new(UnauthenticatedClient::new(&base_url, timeout)?))
        }
        Config::Disabled => Ok(Box::new(Disabled)),
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::net::SocketAddr;

    use axum::Router;
    use tokio::net::TcpListener;
    use url::Url;

    pub const TOKEN: &str = "AQAEAFakeSessionToken==";
    pub const LOCAL_IPV4: &str = "10.0.1.23";

    /// Serves the router on an OS-assigned local port and returns the base url
    /// a client should use to reach it
    pub async fn serve(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        base_url(addr)
    }

    /// Base url pointing at a port nothing listens on
    pub async fn unreachable() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        base_url(addr)
    }

    fn base_url(addr: SocketAddr) -> Url {
        Url::parse(&format!("http://{}/latest/", addr)).unwrap()
    }
}
