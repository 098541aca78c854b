//! # System Orchestration
//!
//! Wires the pieces together and owns their lifetime:
//!
//! 1. **Local cache** - file-backed when a cache directory is configured, else in memory.
//! 2. **Store actor** - spawned unless running local-only; its client becomes the
//!    [`RemoteStore`](crate::sync::RemoteStore) behind the sync layer.
//! 3. **Sync layer, engine, cart** - shared by `Arc`, restored from the cache.
//! 4. **Remote watch** - re-fetches orders whenever the store reports a change.
//!
//! Shutdown runs in reverse: cancel the watch, drop every handle that holds the store
//! client, then await the store actor, which exits once its channel closes.

pub mod order_system;
pub mod tracing;

pub use order_system::*;
pub use self::tracing::setup_tracing;
