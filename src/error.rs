use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("endpoint `{0}` is missing a port (expected `name:port`)")]
    MissingPort(String),
    #[error("endpoint `{0}` has an empty name")]
    EmptyName(String),
    #[error("port `{0}` is invalid")]
    InvalidPort(String),
    #[error("endpoint `{0}` was given more than once")]
    DuplicateEndpoint(String),
    #[error("failed to check host `{0}` (ensure it's a domain or an IP address)")]
    InvalidHost(String, #[source] url::ParseError),
    #[error("no endpoints to wait for")]
    NoEndpoints,
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to build worker pool: {0}")]
    PoolBuildFailed(#[source] rayon::ThreadPoolBuildError),
    #[error("failed to resolve `{0}`: {1}")]
    ResolverFailed(String, #[source] std::io::Error),
    #[error("resolver didn't find any address mapped by `{0}`")]
    NoAddress(String),
    #[error("failed to connect to `{0}`: {1}")]
    ConnectFailed(SocketAddr, #[source] std::io::Error),
    #[error("not reachable before the deadline: {}", .0.join(", "))]
    Unreachable(Vec<String>),
}

impl WaitError {
    /// True when the peer actively refused the connection, i.e. the
    /// endpoint resolved but nothing is listening yet.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            WaitError::ConnectFailed(_, e) if e.kind() == std::io::ErrorKind::ConnectionRefused
        )
    }
}
