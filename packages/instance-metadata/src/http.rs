use std::time::Duration;

use error_stack::{report, Result, ResultExt};
use reqwest::RequestBuilder;
use url::Url;

use crate::error::Error;

const TOKEN_PATH: &str = "api/token";
const LOCAL_IPV4_PATH: &str = "meta-data/local-ipv4";

/// Absolute urls of the metadata resources, derived once from the service's base url
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    pub token: Url,
    pub local_ipv4: Url,
}

impl Endpoints {
    pub fn new(base_url: &Url) -> Result<Self, Error> {
        let base_url = with_trailing_slash(base_url);

        Ok(Self {
            token: join(&base_url, TOKEN_PATH)?,
            local_ipv4: join(&base_url, LOCAL_IPV4_PATH)?,
        })
    }
}

// Url::join replaces the last path segment unless the base ends with a slash
fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url
}

fn join(base_url: &Url, path: &str) -> Result<Url, Error> {
    base_url
        .join(path)
        .change_context(Error::InvalidUrl)
        .attach_printable_lazy(|| format!("{}{}", base_url, path))
}

pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .change_context(Error::Client)
}

/// Sends the request and returns the trimmed response body.
///
/// Transport errors, timeouts, non-success statuses and empty bodies are all errors.
pub(crate) async fn send_for_text(request: RequestBuilder) -> Result<String, Error> {
    let response = request
        .send()
        .await
        .change_context(Error::Request)?
        .error_for_status()
        .change_context(Error::Request)?;

    let body = response.text().await.change_context(Error::Request)?;
    let body = body.trim();

    if body.is_empty() {
        return Err(report!(Error::EmptyResponse));
    }

    Ok(body.to_string())
}
