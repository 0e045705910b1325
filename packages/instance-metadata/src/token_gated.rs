use std::fmt::{Debug, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use error_stack::{Result, ResultExt};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::http::{self, Endpoints};
use crate::{MachineAddress, Resolver};

const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Session token issued by the metadata service
struct Token(String);

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token([REDACTED])")
    }
}

/// Resolves the machine address with a token-gated handshake.
///
/// Every resolution first requests a fresh session token and then reads the address
/// with it. Tokens are never reused and failed steps are never retried. If the token
/// cannot be acquired the address is not requested at all.
pub struct TokenGatedClient {
    client: reqwest::Client,
    endpoints: Endpoints,
    token_ttl: Duration,
}

impl TokenGatedClient {
    /// `timeout` bounds each of the two requests separately
    pub fn new(base_url: &Url, timeout: Duration, token_ttl: Duration) -> Result<Self, Error> {
        Ok(Self {
            client: http::client(timeout)?,
            endpoints: Endpoints::new(base_url)?,
            token_ttl,
        })
    }

    async fn fetch_token(&self) -> Result<Token, Error> {
        let request = self
            .client
            .put(self.endpoints.token.clone())
            .header(TOKEN_TTL_HEADER, self.token_ttl.as_secs().to_string());

        http::send_for_text(request)
            .await
            .map(Token)
            .change_context(Error::Token)
            .attach_printable_lazy(|| self.endpoints.token.clone())
    }

    async fn fetch_local_ipv4(&self, token: &Token) -> Result<String, Error> {
        let request = self
            .client
            .get(self.endpoints.local_ipv4.clone())
            .header(TOKEN_HEADER, token.0.as_str());

        http::send_for_text(request)
            .await
            .change_context(Error::LocalIpv4)
            .attach_printable_lazy(|| self.endpoints.local_ipv4.clone())
    }
}

#[async_trait]
impl Resolver for TokenGatedClient {
    async fn fetch_machine_address(&self) -> MachineAddress {
        let token = match self.fetch_token().await {
            Ok(token) => token,
            Err(report) => {
                warn!("{report:#}");
                return MachineAddress::Unknown;
            }
        };

        match self.fetch_local_ipv4(&token).await {
            Ok(address) => {
                debug!(address = %address, "resolved machine address");
                MachineAddress::Resolved(address)
            }
            Err(report) => {
                warn!("{report:#}");
                MachineAddress::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, put};
    use axum::Router;
    use tracing_test::traced_test;

    use super::*;
    use crate::test_utils::{self, LOCAL_IPV4, TOKEN};

    #[derive(Default)]
    struct Calls {
        token: AtomicUsize,
        local_ipv4: AtomicUsize,
    }

    struct FakeService {
        token_status: StatusCode,
        local_ipv4_status: StatusCode,
        token_delay: Duration,
        calls: Calls,
    }

    impl Default for FakeService {
        fn default() -> Self {
            Self {
                token_status: StatusCode::OK,
                local_ipv4_status: StatusCode::OK,
                token_delay: Duration::ZERO,
                calls: Calls::default(),
            }
        }
    }

    async fn issue_token(
        State(service): State<Arc<FakeService>>,
        headers: HeaderMap,
    ) -> (StatusCode, String) {
        service.calls.token.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(service.token_delay).await;

        if headers.get(TOKEN_TTL_HEADER).is_none() {
            return (StatusCode::BAD_REQUEST, String::new());
        }

        (service.token_status, TOKEN.to_string())
    }

    async fn local_ipv4(
        State(service): State<Arc<FakeService>>,
        headers: HeaderMap,
    ) -> (StatusCode, String) {
        service.calls.local_ipv4.fetch_add(1, Ordering::SeqCst);

        match headers.get(TOKEN_HEADER) {
            Some(token) if token == TOKEN => {
                (service.local_ipv4_status, LOCAL_IPV4.to_string())
            }
            _ => (StatusCode::UNAUTHORIZED, String::new()),
        }
    }

    async fn start(service: FakeService) -> (TokenGatedClient, Arc<FakeService>) {
        let service = Arc::new(service);
        let router = Router::new()
            .route("/latest/api/token", put(issue_token))
            .route("/latest/meta-data/local-ipv4", get(local_ipv4))
            .with_state(service.clone());

        let base_url = test_utils::serve(router).await;
        let client = TokenGatedClient::new(
            &base_url,
            Duration::from_millis(200),
            Duration::from_secs(21600),
        )
        .unwrap();

        (client, service)
    }

    #[tokio::test]
    async fn resolves_address_when_both_steps_succeed() {
        let (client, service) = start(FakeService::default()).await;

        assert_eq!(
            client.fetch_machine_address().await,
            MachineAddress::Resolved(LOCAL_IPV4.to_string())
        );
        assert_eq!(service.calls.token.load(Ordering::SeqCst), 1);
        assert_eq!(service.calls.local_ipv4.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn token_failure_skips_the_metadata_request() {
        let (client, service) = start(FakeService {
            token_status: StatusCode::INTERNAL_SERVER_ERROR,
            ..Default::default()
        })
        .await;

        assert_eq!(client.fetch_machine_address().await, MachineAddress::Unknown);
        assert_eq!(service.calls.token.load(Ordering::SeqCst), 1);
        assert_eq!(service.calls.local_ipv4.load(Ordering::SeqCst), 0);
        assert!(logs_contain("failed to acquire a metadata token"));
    }

    #[tokio::test]
    async fn metadata_failure_yields_unknown() {
        let (client, service) = start(FakeService {
            local_ipv4_status: StatusCode::NOT_FOUND,
            ..Default::default()
        })
        .await;

        assert_eq!(client.fetch_machine_address().await, MachineAddress::Unknown);
        assert_eq!(service.calls.local_ipv4.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_token_request_times_out() {
        let (client, service) = start(FakeService {
            token_delay: Duration::from_secs(2),
            ..Default::default()
        })
        .await;

        assert_eq!(client.fetch_machine_address().await, MachineAddress::Unknown);
        assert_eq!(service.calls.local_ipv4.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_resolution_requests_a_fresh_token() {
        let (client, service) = start(FakeService::default()).await;

        for _ in 0..3 {
            assert!(client.fetch_machine_address().await.is_resolved());
        }

        assert_eq!(service.calls.token.load(Ordering::SeqCst), 3);
        assert_eq!(service.calls.local_ipv4.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unreachable_service_yields_unknown() {
        let client = TokenGatedClient::new(
            &test_utils::unreachable().await,
            Duration::from_millis(200),
            Duration::from_secs(21600),
        )
        .unwrap();

        assert_eq!(client.fetch_machine_address().await, MachineAddress::Unknown);
    }

    #[test]
    fn token_is_redacted_in_debug_output() {
        let token = Token(TOKEN.to_string());

        assert!(!format!("{:?}", token).contains(TOKEN));
    }
}
