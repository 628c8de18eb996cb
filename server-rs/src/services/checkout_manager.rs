use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use booking_engine::CheckoutSession;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

struct Entry {
    session: Arc<CheckoutSession>,
    last_seen: Instant,
}

/// Live checkouts by id. Sessions idle past the TTL are swept.
#[derive(Clone)]
pub struct CheckoutManager {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    ttl: Duration,
}

impl CheckoutManager {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub async fn insert(&self, session: CheckoutSession) -> Arc<CheckoutSession> {
        let session = Arc::new(session);
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session.id(),
            Entry {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        session
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Arc<CheckoutSession>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Checkout not found".into()))?;
        entry.last_seen = Instant::now();
        Ok(entry.session.clone())
    }

    /// Removes the checkout and discards any resolution still in flight for it.
    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound("Checkout not found".into()))?;
        entry.session.cancel().await;
        Ok(())
    }

    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    async fn sweep_at(&self, now: Instant) -> usize {
        let expired: Vec<Entry> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, e)| now.saturating_duration_since(e.last_seen) >= self.ttl)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for entry in &expired {
            entry.session.cancel().await;
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Swept idle checkouts");
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_and_remove() {
        let manager = CheckoutManager::new(600);
        let session = manager.insert(CheckoutSession::new()).await;
        let id = session.id();

        assert_eq!(manager.get(id).await.unwrap().id(), id);
        manager.remove(id).await.unwrap();
        assert!(matches!(manager.get(id).await, Err(AppError::NotFound(_))));
        assert!(manager.remove(id).await.is_err());
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_sessions() {
        let manager = CheckoutManager::new(60);
        manager.insert(CheckoutSession::new()).await;
        assert_eq!(manager.sweep().await, 0);
        assert_eq!(manager.len().await, 1);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(manager.sweep_at(later).await, 1);
        assert_eq!(manager.len().await, 0);
    }
}
