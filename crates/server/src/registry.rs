//! Session registry
//!
//! The only mutable structure shared across calls: call-id to session
//! metadata, inserted on handshake and removed on teardown. DashMap gives
//! safe concurrent insert/remove as connections come and go.

use dashmap::DashMap;
use std::time::Instant;

/// Metadata for one live call
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub started_at: Instant,
    pub called_number: Option<String>,
}

/// Concurrent call-id -> session map
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call. Returns `false` when the call id is already live,
    /// a duplicate UUID handshake the caller should reject.
    pub fn insert(&self, call_id: &str, called_number: Option<String>) -> bool {
        if self.sessions.contains_key(call_id) {
            tracing::warn!(call_id, "duplicate call id in registry");
            return false;
        }
        self.sessions.insert(
            call_id.to_string(),
            SessionEntry {
                started_at: Instant::now(),
                called_number,
            },
        );
        metrics::gauge!("dhvani_active_sessions").set(self.sessions.len() as f64);
        true
    }

    pub fn remove(&self, call_id: &str) {
        if self.sessions.remove(call_id).is_some() {
            tracing::debug!(call_id, "session removed from registry");
        }
        metrics::gauge!("dhvani_active_sessions").set(self.sessions.len() as f64);
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.sessions.contains_key(call_id)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let registry = SessionRegistry::new();
        assert!(registry.insert("call-1", Some("9140000000".into())));
        assert!(registry.contains("call-1"));
        assert_eq!(registry.count(), 1);

        registry.remove("call-1");
        assert!(!registry.contains("call-1"));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_duplicate_call_id_rejected() {
        let registry = SessionRegistry::new();
        assert!(registry.insert("call-1", None));
        assert!(!registry.insert("call-1", None));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_concurrent_inserts() {
        let registry = std::sync::Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.insert(&format!("call-{i}"), None);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.count(), 16);
    }
}
