use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tokio::sync::watch;

use super::{Addrs, Name, Resolve, Resolving};

/// A caching layer over another resolver.
///
/// Entries live until their TTL expires or they have served `max_uses`
/// lookups, whichever comes first. Lookups round-robin across the cached
/// addresses. Concurrent first-lookups of the same host are deduplicated: one
/// task resolves, the rest wait for the cache write.
#[derive(Clone)]
pub struct CachingResolver {
    shared: Arc<Shared>,
}

struct Shared {
    upstream: Arc<dyn Resolve>,
    ttl: Duration,
    max_uses: u32,
    slots: Mutex<HashMap<Box<str>, Slot>>,
}

enum Slot {
    Ready(Cached),
    Pending(watch::Receiver<()>),
}

struct Cached {
    addrs: Vec<IpAddr>,
    expires_at: Instant,
    uses: u32,
    next: usize,
}

impl CachingResolver {
    /// Wraps `upstream` with a cache of the given TTL and per-entry usage
    /// limit.
    pub fn new(upstream: Arc<dyn Resolve>, ttl: Duration, max_uses: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                upstream,
                ttl,
                max_uses: max_uses.max(1),
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }
}

enum Hit {
    Addrs(Vec<IpAddr>),
    Wait(watch::Receiver<()>),
    Miss(watch::Sender<()>),
}

impl Shared {
    fn lookup(&self, host: &str) -> Hit {
        let mut slots = self.slots.lock().expect("dns cache poisoned");
        match slots.get_mut(host) {
            Some(Slot::Ready(cached))
                if cached.expires_at > Instant::now() && cached.uses < self.max_uses =>
            {
                cached.uses += 1;
                let len = cached.addrs.len();
                let start = cached.next % len;
                cached.next = (cached.next + 1) % len;
                let mut rotated = Vec::with_capacity(len);
                rotated.extend_from_slice(&cached.addrs[start..]);
                rotated.extend_from_slice(&cached.addrs[..start]);
                Hit::Addrs(rotated)
            }
            Some(Slot::Pending(rx)) => Hit::Wait(rx.clone()),
            _ => {
                let (tx, rx) = watch::channel(());
                slots.insert(host.into(), Slot::Pending(rx));
                Hit::Miss(tx)
            }
        }
    }

    fn fill(&self, host: &str, addrs: &[IpAddr]) {
        let mut slots = self.slots.lock().expect("dns cache poisoned");
        slots.insert(
            host.into(),
            Slot::Ready(Cached {
                addrs: addrs.to_vec(),
                expires_at: Instant::now() + self.ttl,
                uses: 1,
                next: 1 % addrs.len().max(1),
            }),
        );
    }

    fn evict_pending(&self, host: &str) {
        let mut slots = self.slots.lock().expect("dns cache poisoned");
        if let Some(Slot::Pending(_)) = slots.get(host) {
            slots.remove(host);
        }
    }
}

impl Resolve for CachingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let shared = self.shared.clone();
        Box::pin(async move {
            loop {
                match shared.lookup(name.as_str()) {
                    Hit::Addrs(addrs) => {
                        let addrs: Addrs = Box::new(
                            addrs
                                .into_iter()
                                .map(|ip| SocketAddr::new(ip, 0)),
                        );
                        return Ok(addrs);
                    }
                    Hit::Wait(mut rx) => {
                        // Wakes on cache fill, or on leader failure when the
                        // sender drops. Either way, look again.
                        let _ = rx.changed().await;
                    }
                    Hit::Miss(tx) => {
                        let result = shared.upstream.resolve(name.clone()).await;
                        return match result {
                            Ok(resolved) => {
                                let addrs: Vec<IpAddr> =
                                    resolved.map(|sa| sa.ip()).collect();
                                if addrs.is_empty() {
                                    shared.evict_pending(name.as_str());
                                    drop(tx);
                                    return Err("dns returned no addresses".into());
                                }
                                shared.fill(name.as_str(), &addrs);
                                let _ = tx.send(());
                                let addrs: Addrs = Box::new(
                                    addrs.into_iter().map(|ip| SocketAddr::new(ip, 0)),
                                );
                                Ok(addrs)
                            }
                            Err(err) => {
                                // A failed resolution does not poison the
                                // slot; the next caller retries.
                                shared.evict_pending(name.as_str());
                                drop(tx);
                                Err(err)
                            }
                        };
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
        addrs: Vec<IpAddr>,
    }

    impl CountingResolver {
        fn new(addrs: Vec<IpAddr>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                addrs,
            })
        }
    }

    impl Resolve for CountingResolver {
        fn resolve(&self, _name: Name) -> Resolving {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let addrs = self.addrs.clone();
            Box::pin(async move {
                let addrs: Addrs =
                    Box::new(addrs.into_iter().map(|ip| SocketAddr::new(ip, 0)));
                Ok(addrs)
            })
        }
    }

    fn ips() -> Vec<IpAddr> {
        vec![
            "10.0.0.1".parse().unwrap(),
            "10.0.0.2".parse().unwrap(),
            "10.0.0.3".parse().unwrap(),
        ]
    }

    async fn first_ip(resolver: &CachingResolver, host: &str) -> IpAddr {
        resolver
            .resolve(Name::from(host))
            .await
            .unwrap()
            .next()
            .unwrap()
            .ip()
    }

    #[tokio::test]
    async fn caches_and_round_robins() {
        let upstream = CountingResolver::new(ips());
        let resolver =
            CachingResolver::new(upstream.clone(), Duration::from_secs(60), 100);

        assert_eq!(first_ip(&resolver, "example.com").await, ips()[0]);
        assert_eq!(first_ip(&resolver, "example.com").await, ips()[1]);
        assert_eq!(first_ip(&resolver, "example.com").await, ips()[2]);
        assert_eq!(first_ip(&resolver, "example.com").await, ips()[0]);

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn max_uses_invalidates() {
        let upstream = CountingResolver::new(ips());
        let resolver = CachingResolver::new(upstream.clone(), Duration::from_secs(60), 2);

        for _ in 0..5 {
            let _ = first_ip(&resolver, "example.com").await;
        }
        // 5 lookups at 2 uses per fill: entry refilled on lookups 1, 3, 5.
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn expiry_invalidates() {
        let upstream = CountingResolver::new(ips());
        let resolver = CachingResolver::new(upstream.clone(), Duration::from_millis(0), 100);

        let _ = first_ip(&resolver, "example.com").await;
        let _ = first_ip(&resolver, "example.com").await;
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_lookups_are_deduplicated() {
        let upstream = CountingResolver::new(ips());
        let resolver = Arc::new(CachingResolver::new(
            upstream.clone(),
            Duration::from_secs(60),
            100,
        ));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            tasks.push(tokio::spawn(async move {
                resolver
                    .resolve(Name::from("example.com"))
                    .await
                    .unwrap()
                    .count()
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), 3);
        }

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }
}
