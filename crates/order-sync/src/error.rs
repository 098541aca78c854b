//! Error taxonomy for cart, lifecycle and synchronization operations.
//!
//! Three families, with different recovery rules:
//!
//! - **Input** (`Validation`): malformed request, rejected locally, never retried.
//! - **Business rule** (`InvalidTransition`, `Forbidden`, `AlreadyClaimed`, `NotFound`,
//!   `UnknownRestaurant`, `Conflict`): always surfaced; retrying the same intent gives the same answer, except
//!   `Conflict`, which the user may retry by hand after the view refreshes.
//! - **Transient** (`Timeout`, `RemoteUnavailable`): the local cache keeps serving reads,
//!   writes fail. There is no offline write queue.

use crate::model::{ActorId, OrderId, OrderStatus, RestaurantId};
use crate::sync::CacheError;
use std::time::Duration;
use store_actor::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    /// The request itself is malformed (empty cart, blank address, bad quantity...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The intent is not legal from the order's current status.
    #[error("Cannot {action} order in status {from}")]
    InvalidTransition {
        from: OrderStatus,
        action: &'static str,
    },

    /// The caller's role or identity does not permit the intent.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A delivery agent is already assigned to the order.
    #[error("Order {order_id} already claimed by {agent}")]
    AlreadyClaimed { order_id: OrderId, agent: ActorId },

    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Restaurant not found: {0}")]
    UnknownRestaurant(RestaurantId),

    /// Another writer changed the order between read and write.
    #[error("Order {0} was modified concurrently")]
    Conflict(OrderId),

    #[error("Remote store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Local cache error: {0}")]
    Cache(#[from] CacheError),
}

impl OrderError {
    /// Transient failures: the remote store may answer if the user retries later.
    pub fn is_transient(&self) -> bool {
        matches!(self, OrderError::Timeout(_) | OrderError::RemoteUnavailable(_))
    }

    /// Short, human-readable message for a view to display.
    pub fn user_message(&self) -> String {
        match self {
            OrderError::Validation(reason) => reason.clone(),
            OrderError::InvalidTransition { from, .. } => {
                format!("This order can't be updated while it is {from}.")
            }
            OrderError::Forbidden(_) => "You are not allowed to do that.".to_string(),
            OrderError::AlreadyClaimed { .. } => {
                "Another delivery partner already picked up this order.".to_string()
            }
            OrderError::NotFound(_) => "That order no longer exists.".to_string(),
            OrderError::UnknownRestaurant(_) => "That restaurant is not available.".to_string(),
            OrderError::Conflict(_) => {
                "The order changed while you were editing it. Please try again.".to_string()
            }
            OrderError::Timeout(_) | OrderError::RemoteUnavailable(_) => {
                "We couldn't reach the server. Please try again.".to_string()
            }
            OrderError::Cache(_) => "Saving on this device failed.".to_string(),
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => OrderError::NotFound(OrderId(id)),
            StoreError::VersionConflict { id, .. } => OrderError::Conflict(OrderId(id)),
            unreachable @ (StoreError::ActorClosed | StoreError::ActorDropped) => {
                OrderError::RemoteUnavailable(unreachable.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_domain_errors() {
        let err: OrderError = StoreError::ActorClosed.into();
        assert!(err.is_transient());

        let err: OrderError = StoreError::VersionConflict {
            id: "order_3".into(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(err, OrderError::Conflict(ref id) if id.0 == "order_3"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_user_messages_are_short() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Ready,
            action: "advance",
        };
        assert_eq!(err.user_message(), "This order can't be updated while it is ready.");
        assert!(OrderError::Timeout(Duration::from_secs(5))
            .user_message()
            .contains("try again"));
    }
}
