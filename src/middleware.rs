//! Typed middleware chains.
//!
//! Three distinct chains wrap the transport core: client mutators run once
//! at build time, request mutators run before dispatch, response mutators
//! run after the exchange. Each chain is a priority min-heap keyed by
//! `(priority, insertion order)`: lower priorities run first, ties run in
//! insertion order. A middleware error short-circuits its chain and
//! surfaces to the caller.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::client::{ClientConfig, Request, Response};
use crate::error::Error;

/// Mutates the client configuration at build time.
pub trait ClientMiddleware: Send + Sync + 'static {
    /// Adjusts `config` before the client is assembled.
    fn handle(&self, config: &mut ClientConfig) -> Result<(), Error>;
}

/// Mutates a request before it is dispatched.
pub trait RequestMiddleware: Send + Sync + 'static {
    /// Adjusts `request` before dispatch.
    fn handle(&self, request: &mut Request) -> Result<(), Error>;
}

/// Inspects or mutates a response before it is returned to the caller.
pub trait ResponseMiddleware: Send + Sync + 'static {
    /// Adjusts `response` after the exchange.
    fn handle(&self, response: &mut Response) -> Result<(), Error>;
}

impl<F> ClientMiddleware for F
where
    F: Fn(&mut ClientConfig) -> Result<(), Error> + Send + Sync + 'static,
{
    fn handle(&self, config: &mut ClientConfig) -> Result<(), Error> {
        self(config)
    }
}

impl<F> RequestMiddleware for F
where
    F: Fn(&mut Request) -> Result<(), Error> + Send + Sync + 'static,
{
    fn handle(&self, request: &mut Request) -> Result<(), Error> {
        self(request)
    }
}

impl<F> ResponseMiddleware for F
where
    F: Fn(&mut Response) -> Result<(), Error> + Send + Sync + 'static,
{
    fn handle(&self, response: &mut Response) -> Result<(), Error> {
        self(response)
    }
}

struct Entry<T: ?Sized> {
    priority: i32,
    seq: u64,
    middleware: Arc<T>,
}

impl<T: ?Sized> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Entry {
            priority: self.priority,
            seq: self.seq,
            middleware: self.middleware.clone(),
        }
    }
}

impl<T: ?Sized> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        (self.priority, self.seq) == (other.priority, other.seq)
    }
}

impl<T: ?Sized> Eq for Entry<T> {}

impl<T: ?Sized> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, self.seq).cmp(&(other.priority, other.seq))
    }
}

/// One middleware chain, ordered by `(priority, insertion order)`.
pub(crate) struct Chain<T: ?Sized> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    next_seq: u64,
}

impl<T: ?Sized> Default for Chain<T> {
    fn default() -> Self {
        Chain {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T: ?Sized> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Chain {
            heap: self.heap.clone(),
            next_seq: self.next_seq,
        }
    }
}

impl<T: ?Sized> Chain<T> {
    pub(crate) fn push(&mut self, priority: i32, middleware: Arc<T>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            priority,
            seq,
            middleware,
        }));
    }

    /// Runs `f` over every middleware in chain order. The heap itself is
    /// cloned per run, so a chain can execute any number of times.
    pub(crate) fn run<A>(
        &self,
        mut f: impl FnMut(&T, &mut A) -> Result<(), Error>,
        arg: &mut A,
    ) -> Result<(), Error> {
        let mut heap = self.heap.clone();
        while let Some(Reverse(entry)) = heap.pop() {
            f(&entry.middleware, arg)?;
        }
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T: ?Sized> std::fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("len", &self.heap.len()).finish()
    }
}

pub(crate) type ClientChain = Chain<dyn ClientMiddleware>;
pub(crate) type RequestChain = Chain<dyn RequestMiddleware>;
pub(crate) type ResponseChain = Chain<dyn ResponseMiddleware>;

pub(crate) fn run_request_chain(chain: &RequestChain, request: &mut Request) -> Result<(), Error> {
    chain.run(|mw, request| mw.handle(request), request)
}

pub(crate) fn run_response_chain(
    chain: &ResponseChain,
    response: &mut Response,
) -> Result<(), Error> {
    chain.run(|mw, response| mw.handle(response), response)
}

pub(crate) fn run_client_chain(chain: &ClientChain, config: &mut ClientConfig) -> Result<(), Error> {
    chain.run(|mw, config| mw.handle(config), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Tag(&'static str, Arc<Mutex<Vec<&'static str>>>);

    trait Marker: Send + Sync + 'static {
        fn mark(&self) -> Result<(), Error>;
    }

    impl Marker for Tag {
        fn mark(&self) -> Result<(), Error> {
            self.1.lock().unwrap().push(self.0);
            Ok(())
        }
    }

    struct Fails;

    impl Marker for Fails {
        fn mark(&self) -> Result<(), Error> {
            Err(Error::middleware("boom"))
        }
    }

    fn run(chain: &Chain<dyn Marker>) -> Result<(), Error> {
        chain.run(|mw, _| mw.mark(), &mut ())
    }

    #[test]
    fn priority_orders_execution() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain: Chain<dyn Marker> = Chain::default();
        chain.push(10, Arc::new(Tag("late", log.clone())));
        chain.push(-5, Arc::new(Tag("early", log.clone())));
        chain.push(0, Arc::new(Tag("mid", log.clone())));

        run(&chain).unwrap();
        assert_eq!(&*log.lock().unwrap(), &["early", "mid", "late"]);
    }

    #[test]
    fn equal_priority_preserves_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain: Chain<dyn Marker> = Chain::default();
        for name in ["a", "b", "c", "d"] {
            chain.push(7, Arc::new(Tag(name, log.clone())));
        }

        run(&chain).unwrap();
        assert_eq!(&*log.lock().unwrap(), &["a", "b", "c", "d"]);
    }

    #[test]
    fn chain_is_idempotent_across_runs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain: Chain<dyn Marker> = Chain::default();
        chain.push(1, Arc::new(Tag("x", log.clone())));
        chain.push(0, Arc::new(Tag("y", log.clone())));

        run(&chain).unwrap();
        run(&chain).unwrap();
        assert_eq!(&*log.lock().unwrap(), &["y", "x", "y", "x"]);
    }

    #[test]
    fn error_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain: Chain<dyn Marker> = Chain::default();
        chain.push(0, Arc::new(Tag("ran", log.clone())));
        chain.push(1, Arc::new(Fails));
        chain.push(2, Arc::new(Tag("skipped", log.clone())));

        let err = run(&chain).unwrap_err();
        assert!(err.is_middleware());
        assert_eq!(&*log.lock().unwrap(), &["ran"]);
    }
}
