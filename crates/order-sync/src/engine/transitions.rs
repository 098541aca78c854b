//! Pure transition rules. Each function validates one intent against the current order and
//! returns the modified copy, or the business-rule error that blocks it.

use crate::error::OrderError;
use crate::model::{ActorId, Order, OrderStatus, RestaurantId, Role};
use chrono::{DateTime, Utc};

/// One step along `pending → confirmed → preparing → ready`.
///
/// Only the restaurant role may advance. When `restaurant` is given the order must belong
/// to it.
pub fn advance(
    order: &Order,
    role: Role,
    restaurant: Option<&RestaurantId>,
    now: DateTime<Utc>,
) -> Result<Order, OrderError> {
    if role != Role::Restaurant {
        return Err(OrderError::InvalidTransition {
            from: order.status(),
            action: "advance",
        });
    }
    if let Some(restaurant) = restaurant {
        if restaurant != order.restaurant_id() {
            return Err(OrderError::Forbidden(format!(
                "order {} belongs to restaurant {}",
                order.id(),
                order.restaurant_id()
            )));
        }
    }
    let next = order
        .status()
        .restaurant_next()
        .ok_or(OrderError::InvalidTransition {
            from: order.status(),
            action: "advance",
        })?;
    Ok(order.with_status(next, now))
}

/// `ready → out_for_delivery`, assigning `agent` in the same copy.
pub fn claim(order: &Order, agent: &ActorId, now: DateTime<Utc>) -> Result<Order, OrderError> {
    if let Some(holder) = order.delivery_agent_ref() {
        return Err(OrderError::AlreadyClaimed {
            order_id: order.id().clone(),
            agent: holder.clone(),
        });
    }
    if order.status() != OrderStatus::Ready {
        return Err(OrderError::InvalidTransition {
            from: order.status(),
            action: "claim",
        });
    }
    Ok(order.with_claim(agent.clone(), now))
}

/// `out_for_delivery → delivered`, by the assigned agent only.
///
/// Identity is checked before status: anyone but the assigned agent gets `Forbidden`,
/// whatever state the order is in. The assigned agent gets `InvalidTransition` once the
/// order is no longer out for delivery.
pub fn complete(order: &Order, agent: &ActorId, now: DateTime<Utc>) -> Result<Order, OrderError> {
    if order.delivery_agent_ref() != Some(agent) {
        return Err(OrderError::Forbidden(format!(
            "{agent} is not the delivery agent for order {}",
            order.id()
        )));
    }
    if order.status() != OrderStatus::OutForDelivery {
        return Err(OrderError::InvalidTransition {
            from: order.status(),
            action: "complete",
        });
    }
    Ok(order.with_status(OrderStatus::Delivered, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderCreate, OrderItem};

    fn pending() -> Order {
        Order::new(
            OrderCreate {
                restaurant_id: RestaurantId::new("r1"),
                customer_ref: ActorId::new("cust"),
                items: vec![OrderItem {
                    id: "5".into(),
                    name: "Butter Chicken".into(),
                    unit_price: 329,
                    quantity: 1,
                }],
                total: 444,
                customer_address: "7 Hill St".into(),
            },
            Utc::now(),
        )
    }

    fn ready() -> Order {
        pending().with_status(OrderStatus::Ready, Utc::now())
    }

    #[test]
    fn test_advance_walks_the_restaurant_steps() {
        let mut order = pending();
        for expected in [OrderStatus::Confirmed, OrderStatus::Preparing, OrderStatus::Ready] {
            order = advance(&order, Role::Restaurant, None, Utc::now()).unwrap();
            assert_eq!(order.status(), expected);
        }
        let err = advance(&order, Role::Restaurant, None, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition { from: OrderStatus::Ready, .. }
        ));
    }

    #[test]
    fn test_advance_requires_restaurant_role() {
        let err = advance(&pending(), Role::Customer, None, Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[test]
    fn test_advance_rejects_other_restaurant() {
        let other = RestaurantId::new("r2");
        let err = advance(&pending(), Role::Restaurant, Some(&other), Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[test]
    fn test_claim_sets_status_and_agent_together() {
        let agent = ActorId::new("rider-1");
        let claimed = claim(&ready(), &agent, Utc::now()).unwrap();
        assert_eq!(claimed.status(), OrderStatus::OutForDelivery);
        assert_eq!(claimed.delivery_agent_ref(), Some(&agent));
    }

    #[test]
    fn test_claim_twice_is_already_claimed_even_for_same_agent() {
        let agent = ActorId::new("rider-1");
        let claimed = claim(&ready(), &agent, Utc::now()).unwrap();
        let err = claim(&claimed, &agent, Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::AlreadyClaimed { .. }));
    }

    #[test]
    fn test_claim_before_ready_is_invalid() {
        let err = claim(&pending(), &ActorId::new("rider-1"), Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[test]
    fn test_complete_only_by_assigned_agent() {
        let claimed = claim(&ready(), &ActorId::new("rider-1"), Utc::now()).unwrap();

        let err = complete(&claimed, &ActorId::new("rider-2"), Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));

        let done = complete(&claimed, &ActorId::new("rider-1"), Utc::now()).unwrap();
        assert_eq!(done.status(), OrderStatus::Delivered);
        assert!(done.status().is_terminal());
    }

    #[test]
    fn test_complete_by_stranger_is_forbidden_in_any_status() {
        let rider = ActorId::new("rider-1");
        let stranger = ActorId::new("rider-2");
        let delivered = complete(&claim(&ready(), &rider, Utc::now()).unwrap(), &rider, Utc::now())
            .unwrap();

        for order in [ready(), delivered] {
            let err = complete(&order, &stranger, Utc::now()).unwrap_err();
            assert!(matches!(err, OrderError::Forbidden(_)));
        }
    }

    #[test]
    fn test_complete_twice_by_assigned_agent_is_invalid() {
        let rider = ActorId::new("rider-1");
        let claimed = claim(&ready(), &rider, Utc::now()).unwrap();
        let delivered = complete(&claimed, &rider, Utc::now()).unwrap();

        let err = complete(&delivered, &rider, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition { from: OrderStatus::Delivered, .. }
        ));
    }
}
