// src/store/blob.rs

use std::collections::HashMap;
use std::sync::Mutex;

/// Synchronous key-value blob persistence. The platform storage behind it is
/// treated as instantaneous and non-failing; the store serializes whole
/// collections into it after every mutating operation.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// In-memory implementation, also the test double.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("blob store mutex poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .expect("blob store mutex poisoned")
            .insert(key.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let blob = MemoryBlobStore::new();
        assert_eq!(blob.get("customers"), None);
        blob.set("customers", "[]".to_owned());
        assert_eq!(blob.get("customers").as_deref(), Some("[]"));
    }
}
