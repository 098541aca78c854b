//! # Store Errors
//!
//! Errors surfaced by the store actor and its client. Channel failures mean the store is
//! unreachable; `NotFound` and `VersionConflict` are answers from a live store.

/// Errors that can occur while talking to a store actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store actor closed")]
    ActorClosed,
    #[error("Store actor dropped response channel")]
    ActorDropped,
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },
}

impl StoreError {
    /// True when the store could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, StoreError::ActorClosed | StoreError::ActorDropped)
    }
}
