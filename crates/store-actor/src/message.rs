//! # Store Messages
//!
//! Request types sent from a [`StoreClient`](crate::StoreClient) to a
//! [`StoreActor`](crate::StoreActor), plus the change notices the actor publishes.

use crate::error::StoreError;
use crate::record::StoredRecord;
use tokio::sync::{broadcast, oneshot};

/// Type alias for the one-shot response channel used by the store.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
}

/// Published on the change feed after every successful insert or write.
///
/// Notices carry only the id. Subscribers are expected to re-read what they need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice<Id> {
    pub id: Id,
    pub kind: ChangeKind,
}

/// Internal message type sent to the store actor.
///
/// Each variant maps to one persistence primitive:
///
/// - **Insert**: store a new record under a store-assigned id.
/// - **Get**: fetch one record by id.
/// - **Query**: fetch every record matching a filter.
/// - **Write**: conditional update, applied only if the stored version equals `expected_version`.
/// - **Subscribe**: attach to the change feed.
#[derive(Debug)]
pub enum StoreRequest<T: StoredRecord> {
    Insert {
        record: T,
        respond_to: Response<T>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Query {
        filter: T::Filter,
        respond_to: Response<Vec<T>>,
    },
    Write {
        record: T,
        expected_version: u64,
        respond_to: Response<T>,
    },
    Subscribe {
        respond_to: Response<broadcast::Receiver<ChangeNotice<T::Id>>>,
    },
}
