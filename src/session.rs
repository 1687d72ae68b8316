use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Session key holding the CSRF state of the in-flight login.
pub const STATE_KEY: &str = "state";

/// Session key holding the id token used as `id_token_hint` on logout.
pub const LOGOUT_TOKEN_ID_KEY: &str = "fc_token_id";

/// Per-user session owned by the host application.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn put(&self, key: &str, value: String);

    fn remove(&self, key: &str) -> Option<String>;

    /// Reads and removes a value in one step.
    fn pull(&self, key: &str) -> Option<String> {
        self.remove(key)
    }
}

/// In-process session, suitable for CLIs and tests.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key)
    }
}
