//! Plain data types: actors, cart lines, orders, restaurants.
//!
//! [`Order`] implements [`StoredRecord`](store_actor::StoredRecord) so it can live in the
//! remote store unchanged.

pub mod actor;
pub mod cart_line;
pub mod order;
pub mod restaurant;

pub use actor::*;
pub use cart_line::*;
pub use order::*;
pub use restaurant::*;
