//! Concurrency-safe set of subscribed streaming clients.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::{ClientId, StreamClient};

/// Registry of live connections.
///
/// `snapshot_all` copies the current members out under the read lock, so a
/// broadcast iterates a stable list while subscriptions and removals proceed
/// concurrently. Callers never lock anything themselves.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<BTreeMap<ClientId, Arc<StreamClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. Returns false if a client with the same id exists.
    pub fn add(&self, client: Arc<StreamClient>) -> bool {
        let mut clients = self.clients.write();
        if clients.contains_key(&client.id()) {
            return false;
        }
        clients.insert(client.id(), client);
        true
    }

    /// Remove a client. Only the first caller for a given id gets it back.
    pub fn remove(&self, id: &ClientId) -> Option<Arc<StreamClient>> {
        self.clients.write().remove(id)
    }

    pub fn get(&self, id: &ClientId) -> Option<Arc<StreamClient>> {
        self.clients.read().get(id).cloned()
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.read().contains_key(id)
    }

    /// Point-in-time copy of all registered clients.
    pub fn snapshot_all(&self) -> Vec<Arc<StreamClient>> {
        self.clients.read().values().cloned().collect()
    }

    /// Remove and return every client.
    pub fn drain(&self) -> Vec<Arc<StreamClient>> {
        let drained = std::mem::take(&mut *self.clients.write());
        drained.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn client() -> Arc<StreamClient> {
        Arc::new(StreamClient::new(
            Box::new(RecordingSink::new()),
            CancellationToken::new(),
            Duration::from_secs(1),
        ))
    }

    #[test]
    fn test_add_and_remove() {
        let registry = ClientRegistry::new();
        let a = client();
        let b = client();

        assert!(registry.add(a.clone()));
        assert!(!registry.add(a.clone()));
        assert!(registry.add(b.clone()));
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(&a.id()).is_some());
        assert!(registry.remove(&a.id()).is_none());
        assert!(!registry.contains(&a.id()));
        assert!(registry.contains(&b.id()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_stable_under_mutation() {
        let registry = ClientRegistry::new();
        let a = client();
        let b = client();
        registry.add(a.clone());
        registry.add(b.clone());

        let snapshot = registry.snapshot_all();
        registry.remove(&a.id());
        registry.add(client());

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().any(|c| c.id() == a.id()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = ClientRegistry::new();
        registry.add(client());
        registry.add(client());

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_add_remove() {
        let registry = Arc::new(ClientRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let c = client();
                        registry.add(c.clone());
                        let _ = registry.snapshot_all();
                        assert!(registry.remove(&c.id()).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
