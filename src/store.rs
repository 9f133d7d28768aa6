use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory key-value map backing the bundled commands. Cloning is cheap and every clone shares
/// the same data, so a handle can be captured by each command handler.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    pub fn set(&self, key: String, data: Bytes) {
        self.lock().insert(key, data);
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bytes>> {
        // The map holds no invariants a panicking writer could break.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
