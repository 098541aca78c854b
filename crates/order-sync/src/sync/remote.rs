//! # Remote Store Seam
//!
//! The persistence collaborator as the synchronization layer sees it. Production wiring uses
//! a [`StoreClient<Order>`] talking to a store actor; tests can substitute a `MockStore`
//! client or any other implementation.

use crate::error::OrderError;
use crate::model::{Order, OrderFilter, OrderId};
use async_trait::async_trait;
use store_actor::{ChangeNotice, StoreClient};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

pub type ChangeFeed = broadcast::Receiver<ChangeNotice<OrderId>>;

/// The authoritative order store.
///
/// `write` is conditional: it must fail with [`OrderError::Conflict`] unless the stored
/// version equals `expected_version`. The claim tie-break depends on this.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn read(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError>;

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, OrderError>;

    /// Stores a new order; the store assigns id and version.
    async fn insert(&self, order: Order) -> Result<Order, OrderError>;

    async fn write(&self, order: Order, expected_version: u64) -> Result<Order, OrderError>;

    async fn subscribe(&self) -> Result<ChangeFeed, OrderError>;
}

#[async_trait]
impl RemoteStore for StoreClient<Order> {
    #[instrument(skip(self))]
    async fn read(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
        debug!("Sending request");
        Ok(self.query(filter).await?)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        debug!("Sending request");
        Ok(StoreClient::get(self, id.clone()).await?)
    }

    #[instrument(skip_all)]
    async fn insert(&self, order: Order) -> Result<Order, OrderError> {
        debug!(?order, "Sending request");
        Ok(StoreClient::insert(self, order).await?)
    }

    #[instrument(skip_all, fields(order_id = %order.id(), expected_version = expected_version))]
    async fn write(&self, order: Order, expected_version: u64) -> Result<Order, OrderError> {
        debug!(status = %order.status(), "Sending request");
        Ok(StoreClient::write(self, order, expected_version).await?)
    }

    async fn subscribe(&self) -> Result<ChangeFeed, OrderError> {
        Ok(StoreClient::subscribe(self).await?)
    }
}
