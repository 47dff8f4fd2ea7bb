use std::collections::HashMap;

use boring::ex_data::Index;
use boring::ssl::{ConnectConfiguration, Ssl, SslRef, SslSession};
use once_cell::sync::OnceCell;

/// Key for a cached TLS session: the SNI host and port of the origin.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SessionKey {
    host: Box<str>,
    port: u16,
}

impl SessionKey {
    pub(crate) fn new(host: &str, port: u16) -> SessionKey {
        SessionKey {
            host: host.into(),
            port,
        }
    }
}

/// Client session cache, keyed by SNI. Unbounded; the newest session per
/// origin wins, matching how browsers reuse their most recent ticket.
pub(crate) struct SessionCache {
    sessions: HashMap<SessionKey, SslSession>,
}

impl SessionCache {
    pub(crate) fn new() -> SessionCache {
        SessionCache {
            sessions: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, key: SessionKey, session: SslSession) {
        self.sessions.insert(key, session);
    }

    pub(crate) fn get(&mut self, key: &SessionKey) -> Option<SslSession> {
        self.sessions.get(key).cloned()
    }
}

fn key_index() -> Option<Index<Ssl, SessionKey>> {
    static INDEX: OnceCell<Index<Ssl, SessionKey>> = OnceCell::new();
    INDEX
        .get_or_try_init(Ssl::new_ex_index::<SessionKey>)
        .ok()
        .copied()
}

pub(crate) fn set_session_key(conf: &mut ConnectConfiguration, key: SessionKey) {
    if let Some(index) = key_index() {
        conf.set_ex_data(index, key);
    }
}

pub(crate) fn session_key_of(ssl: &SslRef) -> Option<SessionKey> {
    key_index().and_then(|index| ssl.ex_data(index).cloned())
}
