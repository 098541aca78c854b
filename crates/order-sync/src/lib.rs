//! # Order Sync
//!
//! The order lifecycle behind a three-role food-ordering app: customers, restaurants and
//! delivery agents all work on one shared order record.
//!
//! ## Core Components
//!
//! - **[model]**: Plain data ([`Order`](model::Order), [`CartLine`](model::CartLine),
//!   [`Actor`](model::Actor), [`Restaurant`](model::Restaurant)) and the customization
//!   price table.
//! - **[cart]**: The cart aggregator. Merges lines, computes totals, checks out.
//! - **[engine]**: The lifecycle state machine. Role-gated transitions and the
//!   exactly-once delivery claim.
//! - **[sync]**: The only writer of persisted state. Remote store first, local cache second,
//!   typed change notifications after every write. Also holds the restaurant catalog.
//! - **[views]**: Read-only projections per role.
//! - **[auth]**: The "who is signed in" collaborator.
//! - **[system]**: Wiring, lifecycle and tracing setup.
//!
//! ## Quick Start
//!
//! The binary in `main.rs` walks one order from cart to doorstep:
//! 1. Start an [`OrderSystem`](system::OrderSystem) per actor session.
//! 2. The customer fills a cart and places the order.
//! 3. The restaurant advances it to `ready`; a delivery agent claims and completes it.
//!
//! ## Testing
//!
//! See [`store_actor::mock`] for a scripted store that injects errors and timeouts.

pub mod auth;
pub mod cart;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod sync;
pub mod system;
pub mod views;

pub use error::OrderError;
