// src/session.rs
// Per-client session state for the VPN/geo gate.
// Holds the resolved timezone, the deferred-response snapshot for an
// in-flight challenge, and the last successful verification timestamp.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use spin_sdk::key_value::Store;

/// Sentinel stored when geolocation could not resolve a timezone.
pub const TZ_UNKNOWN: &str = "N/A";

const SESSION_PREFIX: &str = "session:";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ()>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), ()>;
    fn delete(&self, key: &str) -> Result<(), ()>;
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ()> {
        Store::get(self, key).map_err(|_| ())
    }
    fn set(&self, key: &str, value: &[u8]) -> Result<(), ()> {
        Store::set(self, key, value).map_err(|_| ())
    }
    fn delete(&self, key: &str) -> Result<(), ()> {
        Store::delete(self, key).map_err(|_| ())
    }
}

/// Snapshot of the real downstream response held while a timezone
/// challenge is outstanding. Either the whole snapshot exists or none
/// of it does; partial state is unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredResponse {
    pub content: String,
    pub charset: String,
    pub status: u16,
    pub reason: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Timezone resolved from the client IP, or "N/A" when unresolved.
    /// None until the location gate has run for this client.
    #[serde(default)]
    pub tz: Option<String>,
    /// Deferred response for the in-flight challenge, if any.
    #[serde(default)]
    pub pending: Option<DeferredResponse>,
    /// Epoch seconds of the last successful timezone verification.
    #[serde(default)]
    pub last_access: Option<f64>,
}

impl Session {
    /// Loads the session for a client, or a fresh one if absent or corrupt.
    pub fn load<S: KeyValueStore>(store: &S, client: &str) -> Self {
        let key = format!("{}{}", SESSION_PREFIX, client);
        if let Ok(Some(val)) = store.get(&key) {
            if let Ok(session) = serde_json::from_slice::<Session>(&val) {
                return session;
            }
        }
        Session::default()
    }

    pub fn save<S: KeyValueStore>(&self, store: &S, client: &str) {
        let key = format!("{}{}", SESSION_PREFIX, client);
        match serde_json::to_vec(self) {
            Ok(bytes) => {
                let _ = store.set(&key, &bytes);
            }
            Err(_) => {
                println!("[SESSION] failed to serialize session for {}", client);
            }
        }
    }
}
