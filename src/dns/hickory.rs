//! DNS resolution via the [hickory-resolver](https://github.com/hickory-dns/hickory-dns) crate

use std::net::SocketAddr;
use std::sync::Arc;

use hickory_resolver::{
    config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts},
    lookup_ip::LookupIpIntoIter,
    system_conf, TokioAsyncResolver,
};
use once_cell::sync::OnceCell;

use super::{Addrs, Name, Resolve, Resolving};

/// Wrapper around an `AsyncResolver`, which implements the `Resolve` trait.
#[derive(Debug, Clone)]
pub struct HickoryDnsResolver {
    /// Since we might not have been called in the context of a
    /// Tokio Runtime in initialization, so we must delay the actual
    /// construction of the resolver.
    state: Arc<OnceCell<TokioAsyncResolver>>,
    config: Option<ResolverConfig>,
}

struct SocketAddrs {
    iter: LookupIpIntoIter,
}

impl HickoryDnsResolver {
    /// A resolver using the system configuration (`/etc/resolv.conf`).
    pub fn new() -> Self {
        Self {
            state: Arc::new(OnceCell::new()),
            config: None,
        }
    }

    /// A resolver sending queries to a single UDP nameserver.
    pub fn udp(addr: SocketAddr) -> Self {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));
        Self {
            state: Arc::new(OnceCell::new()),
            config: Some(config),
        }
    }

    /// A DNS-over-TLS resolver. `dns_name` is the certificate name presented
    /// by the server (e.g. `dns.google`).
    pub fn tls(addr: SocketAddr, dns_name: &str) -> Self {
        let mut config = ResolverConfig::new();
        let mut ns = NameServerConfig::new(addr, Protocol::Tls);
        ns.tls_dns_name = Some(dns_name.to_owned());
        config.add_name_server(ns);
        Self {
            state: Arc::new(OnceCell::new()),
            config: Some(config),
        }
    }

    fn build(&self) -> Result<TokioAsyncResolver, crate::error::BoxError> {
        match &self.config {
            Some(config) => Ok(TokioAsyncResolver::tokio(
                config.clone(),
                ResolverOpts::default(),
            )),
            None => {
                let (config, opts) = system_conf::read_system_conf()?;
                Ok(TokioAsyncResolver::tokio(config, opts))
            }
        }
    }
}

impl Default for HickoryDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolve for HickoryDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let inner = resolver.state.get_or_try_init(|| resolver.build())?;
            let lookup = inner.lookup_ip(name.as_str()).await?;

            let addrs: Addrs = Box::new(super::prefer_ipv4(
                SocketAddrs {
                    iter: lookup.into_iter(),
                }
                .collect(),
            )
            .into_iter());
            Ok(addrs)
        })
    }
}

impl Iterator for SocketAddrs {
    type Item = SocketAddr;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|ip_addr| SocketAddr::new(ip_addr, 0))
    }
}
