use std::{fmt::Debug, net::TcpStream, time::Duration};

use crate::{endpoint::Endpoint, error::WaitError, resolver};

/// A single connection attempt against an endpoint.
pub trait Connector: Debug + Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> Result<(), WaitError>;
}

#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Connector for TcpConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<(), WaitError> {
        let addrs = resolver::lookup(endpoint.host(), endpoint.port())?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                // The stream is closed as soon as it goes out of scope.
                Ok(_stream) => return Ok(()),
                Err(e) => last_error = Some(WaitError::ConnectFailed(addr, e)),
            }
        }

        // lookup never returns an empty list.
        Err(last_error.unwrap_or_else(|| WaitError::NoAddress(endpoint.host().into())))
    }
}
