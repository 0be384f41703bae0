use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Pnr;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Record could not be encoded or decoded: {0}")]
    Codec(String),
}

/// Opaque durable store for committed bookings. The storage format is the
/// implementation's concern.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn save(&self, pnr: &Pnr) -> Result<(), StoreError>;

    async fn get_by_locator(&self, locator: &str) -> Result<Option<Pnr>, StoreError>;

    async fn get_by_session(&self, session_id: &str) -> Result<Option<Pnr>, StoreError>;

    async fn get_all(&self) -> Result<Vec<Pnr>, StoreError>;

    /// Returns whether a record was removed.
    async fn remove(&self, id: Uuid) -> Result<bool, StoreError>;
}
