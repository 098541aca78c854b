//! # Store Actor
//!
//! An actor-backed record store with conditional writes and a change feed.
//!
//! A single Tokio task owns every record of one type and applies requests strictly in
//! arrival order. That gives callers the one guarantee a multi-writer system needs from its
//! authoritative store: a **conditional write** (`write(record, expected_version)`) either
//! lands on exactly the version the caller read, or is rejected with
//! [`StoreError::VersionConflict`]. No locks are held anywhere.
//!
//! ## Architecture Overview
//!
//! 1. **Record Layer** ([`StoredRecord`]) - identity, version and filter matching for a record type
//! 2. **Runtime Layer** ([`StoreActor`]) - sequential request processing and the change feed
//! 3. **Interface Layer** ([`StoreClient`]) - cloneable async handle
//!
//! ## Example
//!
//! ```rust
//! use store_actor::{StoreActor, StoredRecord};
//!
//! #[derive(Clone, Debug)]
//! struct Counter { id: u32, version: u64, value: i64 }
//!
//! impl StoredRecord for Counter {
//!     type Id = u32;
//!     type Filter = ();
//!     fn id(&self) -> &u32 { &self.id }
//!     fn assign_id(&mut self, id: u32) { self.id = id; }
//!     fn version(&self) -> u64 { self.version }
//!     fn set_version(&mut self, version: u64) { self.version = version; }
//!     fn matches(&self, _: &()) -> bool { true }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, client) = StoreActor::<Counter>::new(10);
//!     tokio::spawn(actor.run());
//!
//!     let stored = client.insert(Counter { id: 0, version: 0, value: 1 }).await.unwrap();
//!     assert_eq!(stored.version, 1);
//!
//!     let bumped = Counter { value: 2, ..stored.clone() };
//!     let written = client.write(bumped.clone(), stored.version).await.unwrap();
//!     assert_eq!(written.version, 2);
//!
//!     // A second writer that read version 1 loses
//!     assert!(client.write(bumped, 1).await.is_err());
//! }
//! ```
//!
//! ## Testing
//!
//! See the [`mock`] module for `MockStore`, which answers client requests from a script and
//! can inject errors or hang to exercise timeouts.

pub mod actor;
pub mod client;
pub mod error;
pub mod message;
pub mod mock;
pub mod record;

pub use actor::StoreActor;
pub use client::StoreClient;
pub use error::StoreError;
pub use message::{ChangeKind, ChangeNotice, Response, StoreRequest};
pub use record::StoredRecord;
