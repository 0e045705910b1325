use std::time::Duration;

use async_trait::async_trait;
use error_stack::{Result, ResultExt};
use tracing::warn;
use url::Url;

use crate::error::Error;
use crate::http::{self, Endpoints};
use crate::{MachineAddress, Resolver};

/// Reads the machine address with a single unauthenticated request.
///
/// Only works where the metadata service still accepts v1 style reads.
pub struct UnauthenticatedClient {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl UnauthenticatedClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            client: http::client(timeout)?,
            endpoints: Endpoints::new(base_url)?,
        })
    }

    async fn fetch_local_ipv4(&self) -> Result<String, Error> {
        http::send_for_text(self.client.get(self.endpoints.local_ipv4.clone()))
            .await
            .change_context(Error::LocalIpv4)
            .attach_printable_lazy(|| self.endpoints.local_ipv4.clone())
    }
}

#[async_trait]
impl Resolver for UnauthenticatedClient {
    async fn fetch_machine_address(&self) -> MachineAddress {
        self.fetch_local_ipv4()
            .await
            .inspect_err(|report| warn!("{report:#}"))
            .ok()
            .into()
    }
}
