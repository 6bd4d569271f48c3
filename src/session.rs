//! Session identity
//!
//! One opaque conversation identifier per client context. The identifier is a
//! correlation key for the remote service, not a credential: uniqueness is
//! best-effort and collisions are tolerated.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Storage key under which the identifier is kept
pub const SESSION_KEY: &str = "session_id";

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Synthesize a fresh identifier: `session_<unix-millis>_<base36 suffix>`
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
            .collect();
        Self(format!("session_{millis}_{suffix}"))
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context-scoped key/value storage. Contents vanish with the context.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Return the value under `key`, inserting `init()` first if absent.
    /// The check and the insert happen atomically.
    fn get_or_insert_with(&self, key: &str, init: &mut dyn FnMut() -> String) -> String;

    fn remove(&self, key: &str) -> Option<String>;
}

/// In-process store; dropping it ends the context
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn get_or_insert_with(&self, key: &str, init: &mut dyn FnMut() -> String) -> String {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_insert_with(init)
            .clone()
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

/// Return this context's identifier, creating and persisting it on first use
pub fn get_or_create(store: &dyn SessionStore) -> SessionId {
    let mut created = false;
    let value = store.get_or_insert_with(SESSION_KEY, &mut || {
        created = true;
        SessionId::generate().0
    });
    if created {
        tracing::info!(session_id = %value, "Created session identifier");
    } else {
        tracing::debug!(session_id = %value, "Reusing session identifier");
    }
    SessionId(value)
}
