use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid metadata service url")]
    InvalidUrl,
    #[error("failed to build the http client")]
    Client,
    #[error("metadata request failed")]
    Request,
    #[error("metadata service returned an empty response")]
    EmptyResponse,
    #[error("failed to acquire a metadata token")]
    Token,
    #[error("failed to fetch the local ipv4 address")]
    LocalIpv4,
}
