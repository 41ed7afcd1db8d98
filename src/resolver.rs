use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::WaitError;

/// Resolves `host` through the system resolver. Every address family is
/// kept, in the order the resolver returns them.
pub fn lookup(host: &str, port: u16) -> Result<Vec<SocketAddr>, WaitError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| WaitError::ResolverFailed(host.into(), e))?
        .collect();

    if addrs.is_empty() {
        return Err(WaitError::NoAddress(host.into()));
    }

    log::debug!("Found {} address(es) mapped by `{}`: {:?}", addrs.len(), host, addrs);

    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_ip_literal_without_dns() {
        let addrs = lookup("127.0.0.1", 8080).unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:8080".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn resolves_ipv6_literal() {
        let addrs = lookup("::1", 443).unwrap();
        assert_eq!(addrs[0].port(), 443);
        assert!(addrs[0].is_ipv6());
    }

    #[test]
    fn unresolvable_host_is_an_error() {
        let err = lookup("does-not-exist.invalid", 80).unwrap_err();
        assert!(matches!(
            err,
            WaitError::ResolverFailed(..) | WaitError::NoAddress(_)
        ));
    }
}
