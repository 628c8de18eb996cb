//! Last-writer-wins bookkeeping for in-flight resolution calls.

use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    generation: u64,
    key: K,
}

impl<K> Ticket<K> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self) -> &K {
        &self.key
    }
}

#[derive(Debug)]
struct Latest<K> {
    generation: u64,
    key: Option<K>,
}

/// Issues a ticket per call. A result may be applied only if its ticket is the
/// latest one issued, or was issued for the same parameters as the latest.
/// `invalidate` makes every outstanding ticket stale.
#[derive(Debug)]
pub struct ResolutionTracker<K> {
    latest: Mutex<Latest<K>>,
}

impl<K: Clone + PartialEq> Default for ResolutionTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + PartialEq> ResolutionTracker<K> {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(Latest {
                generation: 0,
                key: None,
            }),
        }
    }

    pub async fn issue(&self, key: K) -> Ticket<K> {
        let mut latest = self.latest.lock().await;
        latest.generation += 1;
        latest.key = Some(key.clone());
        Ticket {
            generation: latest.generation,
            key,
        }
    }

    pub async fn is_current(&self, ticket: &Ticket<K>) -> bool {
        let latest = self.latest.lock().await;
        ticket.generation == latest.generation || latest.key.as_ref() == Some(&ticket.key)
    }

    pub async fn invalidate(&self) {
        let mut latest = self.latest.lock().await;
        latest.generation += 1;
        latest.key = None;
    }
}
