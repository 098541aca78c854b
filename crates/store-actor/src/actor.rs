//! # Store Actor
//!
//! This module defines the `StoreActor`, the task that owns a collection of records and
//! applies every request against it one at a time.
//!
//! Because a single task holds the `HashMap`, two writes can never interleave. A conditional
//! write that checks the version and stores the new record is atomic without any lock, which is
//! exactly the guarantee a caller needs to make "first write wins" hold.

use crate::client::StoreClient;
use crate::error::StoreError;
use crate::message::{ChangeKind, ChangeNotice, StoreRequest};
use crate::record::StoredRecord;
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Capacity of the change feed. Slow subscribers lag rather than block writers.
const CHANGE_FEED_CAPACITY: usize = 256;

/// The actor that owns a collection of records.
///
/// # Usage Pattern
///
/// 1.  **Create**: Call `StoreActor::new()` to get the `actor` (server) and `client` (interface).
/// 2.  **Run**: Spawn `actor.run()` in a background task.
/// 3.  **Use**: Clone the client wherever the collection is read or written.
///
/// The actor stops once every client has been dropped.
///
/// ## Operations
///
/// * **Insert**: assigns the next id from an internal `u32` counter, sets version 1,
///   stores the record and publishes `Inserted`.
/// * **Get**: returns a clone of the record, or `None`.
/// * **Query**: returns clones of every record matching the filter.
/// * **Write**: rejects with `NotFound` or `VersionConflict`, otherwise stores the record
///   with the version incremented and publishes `Updated`.
/// * **Subscribe**: hands out a new receiver on the change feed.
pub struct StoreActor<T: StoredRecord> {
    receiver: mpsc::Receiver<StoreRequest<T>>,
    records: HashMap<T::Id, T>,
    next_id: u32,
    changes: broadcast::Sender<ChangeNotice<T::Id>>,
}

impl<T: StoredRecord> StoreActor<T> {
    /// Creates a new `StoreActor` and its associated `StoreClient`.
    ///
    /// `buffer_size` is the capacity of the request channel. When it is full, client calls
    /// wait for space.
    pub fn new(buffer_size: usize) -> (Self, StoreClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        let actor = Self {
            receiver,
            records: HashMap::new(),
            next_id: 1,
            changes,
        };
        (actor, StoreClient::new(sender))
    }

    /// Runs the request loop until the channel closes.
    pub async fn run(mut self) {
        // Just the type name ("Order"), not the full path
        let record_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(record_type, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Insert { record, respond_to } => {
                    let stored = self.insert(record);
                    info!(record_type, id = %stored.id(), size = self.records.len(), "Inserted");
                    let _ = respond_to.send(Ok(stored));
                }
                StoreRequest::Get { id, respond_to } => {
                    let record = self.records.get(&id).cloned();
                    debug!(record_type, %id, found = record.is_some(), "Get");
                    let _ = respond_to.send(Ok(record));
                }
                StoreRequest::Query { filter, respond_to } => {
                    let matched: Vec<T> = self
                        .records
                        .values()
                        .filter(|r| r.matches(&filter))
                        .cloned()
                        .collect();
                    debug!(record_type, ?filter, matched = matched.len(), "Query");
                    let _ = respond_to.send(Ok(matched));
                }
                StoreRequest::Write {
                    record,
                    expected_version,
                    respond_to,
                } => {
                    let id = record.id().clone();
                    let result = self.write(record, expected_version);
                    match &result {
                        Ok(stored) => {
                            info!(record_type, %id, version = stored.version(), "Written")
                        }
                        Err(e) => warn!(record_type, %id, error = %e, "Write rejected"),
                    }
                    let _ = respond_to.send(result);
                }
                StoreRequest::Subscribe { respond_to } => {
                    debug!(record_type, subscribers = self.changes.receiver_count() + 1, "Subscribe");
                    let _ = respond_to.send(Ok(self.changes.subscribe()));
                }
            }
        }

        info!(record_type, size = self.records.len(), "Shutdown");
    }

    fn insert(&mut self, mut record: T) -> T {
        let id = T::Id::from(self.next_id);
        self.next_id += 1;
        record.assign_id(id.clone());
        record.set_version(1);
        self.records.insert(id.clone(), record.clone());
        self.publish(id, ChangeKind::Inserted);
        record
    }

    fn write(&mut self, mut record: T, expected_version: u64) -> Result<T, StoreError> {
        let id = record.id().clone();
        let current = self
            .records
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if current.version() != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: current.version(),
            });
        }
        record.set_version(expected_version + 1);
        self.records.insert(id.clone(), record.clone());
        self.publish(id, ChangeKind::Updated);
        Ok(record)
    }

    fn publish(&self, id: T::Id, kind: ChangeKind) {
        // No subscribers is not an error
        let _ = self.changes.send(ChangeNotice { id, kind });
    }
}
