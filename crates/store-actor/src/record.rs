//! # StoredRecord Trait
//!
//! The `StoredRecord` trait is the contract every record kept by a [`StoreActor`](crate::StoreActor)
//! must satisfy. It gives the actor just enough to do its job: read and assign the identifier,
//! read and bump the concurrency version, and decide whether the record matches a query filter.
//!
//! # Architecture Note
//! The store never interprets a record's business fields. Validation of *what* a write means
//! belongs to the caller; the store only guarantees *how* it lands: one request at a time,
//! and a write only succeeds against the version the caller last read.
//!
//! We use associated types (`Id`, `Filter`) so a store of orders can only be queried with an
//! order filter. The compiler rules out sending the wrong shape of query.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any record must implement to be kept by a `StoreActor`.
pub trait StoredRecord: Clone + Send + Sync + 'static {
    /// Unique identifier. Must be constructible from `u32` so the store can assign ids.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + From<u32>;

    /// Query filter understood by [`StoredRecord::matches`].
    type Filter: Send + Sync + Debug;

    /// The record's current identifier.
    fn id(&self) -> &Self::Id;

    /// Replace the identifier. Called once by the store on insert.
    fn assign_id(&mut self, id: Self::Id);

    /// Optimistic-concurrency token. Starts at 1 and grows by one on every write.
    fn version(&self) -> u64;

    /// Set by the store; callers never bump the version themselves.
    fn set_version(&mut self, version: u64);

    /// Whether this record belongs in the result of a query with `filter`.
    fn matches(&self, filter: &Self::Filter) -> bool;
}
