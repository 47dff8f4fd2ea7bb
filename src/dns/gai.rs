use super::{Addrs, Name, Resolve, Resolving};

/// A resolver using blocking `getaddrinfo` calls in a threadpool.
#[derive(Debug, Default, Clone)]
pub struct GaiResolver {
    _priv: (),
}

impl GaiResolver {
    /// Construct a new `GaiResolver`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Resolve for GaiResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let host = name.as_str().to_owned();
            let addrs = tokio::task::spawn_blocking(move || {
                use std::net::ToSocketAddrs;
                // Port is a placeholder; callers override it from the URL.
                (host.as_str(), 0).to_socket_addrs()
            })
            .await??;

            let addrs: Addrs = Box::new(super::prefer_ipv4(addrs.collect()).into_iter());
            Ok(addrs)
        })
    }
}
