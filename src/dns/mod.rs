//! DNS resolution

pub(crate) mod cache;
pub(crate) mod gai;
#[cfg(feature = "hickory-dns")]
pub(crate) mod hickory;

use std::{
    borrow::Cow,
    collections::HashMap,
    fmt,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
};

use crate::error::BoxError;

/// A domain name to resolve into IP addresses.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    pub(crate) fn new(host: Box<str>) -> Name {
        Name { host }
    }

    /// View the hostname as a string slice.
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value.into())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// Alias for an `Iterator` trait object over `SocketAddr`.
pub type Addrs = Box<dyn Iterator<Item = SocketAddr> + Send>;

/// Alias for the `Future` type returned by a DNS resolver.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Addrs, BoxError>> + Send>>;

/// Trait for customizing DNS resolution in camo.
pub trait Resolve: Send + Sync {
    /// Performs DNS resolution on a `Name`.
    ///
    /// The return type is a future containing an iterator of `SocketAddr`.
    /// The port in the resolved `SocketAddr`s is ignored; the target port
    /// comes from the request URL.
    fn resolve(&self, name: Name) -> Resolving;
}

/// A shared, object-safe handle to a resolver.
#[derive(Clone)]
pub(crate) struct DynResolver {
    resolver: Arc<dyn Resolve>,
}

impl DynResolver {
    pub(crate) fn new(resolver: Arc<dyn Resolve>) -> Self {
        Self { resolver }
    }

    pub(crate) fn resolve(&self, name: Name) -> Resolving {
        self.resolver.resolve(name)
    }
}

impl fmt::Debug for DynResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynResolver").finish()
    }
}

/// DNS resolver that supports hostname overrides.
///
/// This resolver first checks for manual hostname-to-IP mappings before
/// falling back to the underlying DNS resolver. Useful for testing or
/// bypassing DNS for specific domains.
pub(crate) struct DnsResolverWithOverrides {
    dns_resolver: Arc<dyn Resolve>,
    overrides: Arc<HashMap<Cow<'static, str>, Vec<SocketAddr>>>,
}

impl DnsResolverWithOverrides {
    pub(crate) fn new(
        dns_resolver: Arc<dyn Resolve>,
        overrides: HashMap<Cow<'static, str>, Vec<SocketAddr>>,
    ) -> Self {
        DnsResolverWithOverrides {
            dns_resolver,
            overrides: Arc::new(overrides),
        }
    }
}

impl Resolve for DnsResolverWithOverrides {
    fn resolve(&self, name: Name) -> Resolving {
        match self.overrides.get(name.as_str()) {
            Some(dest) => {
                let addrs: Addrs = Box::new(dest.clone().into_iter());
                Box::pin(std::future::ready(Ok(addrs)))
            }
            None => self.dns_resolver.resolve(name),
        }
    }
}

/// Orders resolved addresses so IPv4 comes first, preserving relative order
/// within each family.
pub(crate) fn prefer_ipv4(addrs: Vec<SocketAddr>) -> Vec<SocketAddr> {
    let (v4, v6): (Vec<_>, Vec<_>) = addrs.into_iter().partition(SocketAddr::is_ipv4);
    v4.into_iter().chain(v6).collect()
}

/// Parses a `host:port` DNS server address, rejecting port 0.
pub(crate) fn parse_dns_addr(addr: &str) -> crate::Result<SocketAddr> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(crate::error::Error::builder)?;
    if addr.port() == 0 {
        return Err(crate::error::Error::builder("dns server port must be 1..65535"));
    }
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ipv4_sorts_first() {
        let v6 = SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 0);
        let v4 = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
        let sorted = prefer_ipv4(vec![v6, v4, v6]);
        assert_eq!(sorted, vec![v4, v6, v6]);
    }

    #[test]
    fn dns_addr_grammar() {
        assert!(parse_dns_addr("1.1.1.1:853").is_ok());
        assert!(parse_dns_addr("1.1.1.1:0").is_err());
        assert!(parse_dns_addr("1.1.1.1").is_err());
        assert!(parse_dns_addr("nonsense").is_err());
    }
}
