use std::{
    collections::HashSet,
    fmt::{self, Display},
    net::IpAddr,
};

use url::Host;

use crate::error::WaitError;

/// A named `host:port` pair whose TCP reachability is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    name: String,
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(name: &str, host: &str, port: u16) -> Result<Self, WaitError> {
        if name.is_empty() {
            return Err(WaitError::EmptyName(format!("{}:{}", name, port)));
        }
        if port == 0 {
            return Err(WaitError::InvalidPort(port.to_string()));
        }
        check_host(host)?;

        Ok(Self {
            name: name.into(),
            host: host.into(),
            port,
        })
    }

    /// Parses a `name:port` specifier. The host is shared by the whole run.
    pub fn parse(spec: &str, host: &str) -> Result<Self, WaitError> {
        let (name, raw_port) = spec
            .rsplit_once(':')
            .ok_or_else(|| WaitError::MissingPort(spec.into()))?;

        if name.is_empty() {
            return Err(WaitError::EmptyName(spec.into()));
        }

        let port = raw_port
            .parse::<u16>()
            .map_err(|_| WaitError::InvalidPort(raw_port.into()))?;

        Self::new(name, host, port)
    }

    /// Parses every specifier, rejecting names given more than once.
    pub fn parse_all<S: AsRef<str>>(specs: &[S], host: &str) -> Result<Vec<Self>, WaitError> {
        let mut seen = HashSet::new();

        specs
            .iter()
            .map(|spec| {
                let endpoint = Self::parse(spec.as_ref(), host)?;
                if !seen.insert(endpoint.name.clone()) {
                    return Err(WaitError::DuplicateEndpoint(endpoint.name));
                }
                Ok(endpoint)
            })
            .collect()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => write!(f, "{} ([{}]:{})", self.name, ip, self.port),
            _ => write!(f, "{} ({}:{})", self.name, self.host, self.port),
        }
    }
}

// Syntax only; resolution happens on every probe attempt.
fn check_host(host: &str) -> Result<(), WaitError> {
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    Host::parse(host)
        .map(|_| ())
        .map_err(|e| WaitError::InvalidHost(host.into(), e))
}
