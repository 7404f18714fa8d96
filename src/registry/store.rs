use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::crawler::CrawlHandle;

/// Length of the random part of a session id
const SUFFIX_LEN: usize = 11;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque session identifier
///
/// Base-36 creation time in milliseconds followed by a random lowercase
/// alphanumeric suffix, so ids sort roughly by age.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Generates an id for a session created at `now`
    pub fn generate(now: DateTime<Utc>) -> Self {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let mut id = to_base36(millis);

        let mut rng = rand::thread_rng();
        id.extend((0..SUFFIX_LEN).map(|_| BASE36_DIGITS[rng.gen_range(0..36)] as char));

        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[derive(Debug, Clone)]
struct Entry {
    handle: CrawlHandle,
    created_at: DateTime<Utc>,
}

/// Maps session ids to crawl handles, with age-based expiry
///
/// A session past its TTL is dropped only once its crawl has stopped
/// running, so a long crawl is never orphaned mid-flight.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.ttl())
    }

    /// Stores a handle under a fresh id
    pub fn insert(&self, handle: CrawlHandle) -> SessionId {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        let mut id = SessionId::generate(now);
        while sessions.contains_key(&id) {
            id = SessionId::generate(now);
        }

        sessions.insert(
            id.clone(),
            Entry {
                handle,
                created_at: now,
            },
        );
        tracing::debug!("Registered session {}", id);
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<CrawlHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|entry| entry.handle.clone())
    }

    /// Removes a session, returning its handle
    pub fn remove(&self, id: &SessionId) -> Option<CrawlHandle> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|entry| entry.handle)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops finished sessions older than the TTL
    ///
    /// # Returns
    ///
    /// The number of sessions removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();

        sessions.retain(|id, entry| {
            let expired = (now - entry.created_at)
                .to_std()
                .map(|age| age > ttl)
                .unwrap_or(false);

            if expired && !entry.handle.is_running() {
                tracing::info!("Cleaned up session {}", id);
                false
            } else {
                true
            }
        });

        before - sessions.len()
    }

    /// Builds a registry from `config` and starts its cleanup task
    pub fn start(config: &SessionConfig) -> (Arc<Self>, JoinHandle<()>) {
        let registry = Arc::new(Self::from_config(config));
        let cleanup = registry.spawn_cleanup(config.cleanup_interval());
        (registry, cleanup)
    }

    /// Purges expired sessions every `interval` in the background
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = registry.purge_expired(Utc::now());
                if removed > 0 {
                    tracing::debug!("Session cleanup removed {} sessions", removed);
                }
            }
        })
    }
}
