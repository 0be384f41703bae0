use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use vireo_pnr::models::Pnr;
use vireo_pnr::repository::{BookingStore, StoreError};

/// In-memory booking store with a locator index. Suitable for tests and
/// single-node deployments; the trait keeps a durable backend swappable.
pub struct InMemoryBookingStore {
    records: RwLock<HashMap<Uuid, Pnr>>,
    by_locator: RwLock<HashMap<String, Uuid>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            by_locator: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn save(&self, pnr: &Pnr) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let mut by_locator = self.by_locator.write().await;

        if let Some(locator) = &pnr.locator {
            by_locator.insert(locator.clone(), pnr.id);
        }
        records.insert(pnr.id, pnr.clone());
        tracing::debug!(booking = %pnr.id, "booking saved");
        Ok(())
    }

    async fn get_by_locator(&self, locator: &str) -> Result<Option<Pnr>, StoreError> {
        let by_locator = self.by_locator.read().await;
        let Some(id) = by_locator.get(locator) else {
            return Ok(None);
        };
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn get_by_session(&self, session_id: &str) -> Result<Option<Pnr>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|p| p.session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Pnr>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let mut by_locator = self.by_locator.write().await;

        let removed = records.remove(&id);
        if let Some(pnr) = &removed {
            if let Some(locator) = &pnr.locator {
                by_locator.remove(locator);
            }
        }
        Ok(removed.is_some())
    }
}
