//! # Store Client
//!
//! The cloneable handle used to talk to a [`StoreActor`](crate::StoreActor).

use crate::error::StoreError;
use crate::message::{ChangeNotice, StoreRequest};
use crate::record::StoredRecord;
use tokio::sync::{broadcast, mpsc, oneshot};

/// A type-safe client for a `StoreActor`.
///
/// Holds only the request sender, so cloning is cheap. Every method resolves to
/// `Result<_, StoreError>`; a closed channel becomes `ActorClosed`, a dropped reply
/// becomes `ActorDropped`.
pub struct StoreClient<T: StoredRecord> {
    sender: mpsc::Sender<StoreRequest<T>>,
}

// Manual impl: deriving would require `T: Clone` on the handle itself
impl<T: StoredRecord> Clone for StoreClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: StoredRecord> StoreClient<T> {
    pub fn new(sender: mpsc::Sender<StoreRequest<T>>) -> Self {
        Self { sender }
    }

    pub async fn insert(&self, record: T) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Insert { record, respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get { id, respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    pub async fn query(&self, filter: T::Filter) -> Result<Vec<T>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Query { filter, respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    /// Conditional update: succeeds only if the stored version equals `expected_version`.
    pub async fn write(&self, record: T, expected_version: u64) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Write {
                record,
                expected_version,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    pub async fn subscribe(
        &self,
    ) -> Result<broadcast::Receiver<ChangeNotice<T::Id>>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Subscribe { respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }
}
