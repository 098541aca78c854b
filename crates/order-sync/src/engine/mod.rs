//! # Order Lifecycle Engine
//!
//! The state machine that every order mutation passes through:
//!
//! ```text
//! pending → confirmed → preparing → ready → out_for_delivery → delivered
//! └──────────── restaurant ───────────┘ └─ claim ─┘       └ complete ┘
//! ```
//!
//! Each operation reads the current order, validates the intent with a pure rule from
//! [`transitions`], then hands the new copy to the [`SyncLayer`] as a conditional write
//! against the version it read. The engine holds no locks: when two writers race, the
//! store's version check lets exactly one through.
//!
//! ## Conflicts
//!
//! A losing writer gets `Conflict` from the store. The engine re-reads the order once and
//! re-validates the same intent against it:
//!
//! - if the fresh order now breaks a business rule, that error is returned (a lost claim race
//!   reports `AlreadyClaimed`);
//! - otherwise `Conflict` is returned and retrying is left to the user.

pub mod transitions;

use crate::cart::CartSnapshot;
use crate::error::OrderError;
use crate::model::{ActorId, Order, OrderCreate, OrderId, OrderItem, RestaurantId, Role};
use crate::sync::SyncLayer;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct LifecycleEngine {
    sync: Arc<SyncLayer>,
}

impl LifecycleEngine {
    pub fn new(sync: Arc<SyncLayer>) -> Self {
        Self { sync }
    }

    pub fn sync(&self) -> &Arc<SyncLayer> {
        &self.sync
    }

    /// Creates a `pending` order from a cart snapshot.
    ///
    /// The total is frozen from the snapshot's totals and never recomputed.
    #[instrument(skip(self, cart), fields(lines = cart.lines.len()))]
    pub async fn create(
        &self,
        cart: &CartSnapshot,
        address: &str,
        customer: &ActorId,
    ) -> Result<Order, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::Validation("Cart is empty".to_string()));
        }
        let restaurant_id = cart.lines[0].restaurant_id.clone();
        if address.trim().is_empty() {
            return Err(OrderError::Validation(
                "Delivery address is required".to_string(),
            ));
        }
        if cart.lines.iter().any(|l| l.restaurant_id != restaurant_id) {
            return Err(OrderError::Validation(
                "Cart mixes items from several restaurants".to_string(),
            ));
        }

        let order = Order::new(
            OrderCreate {
                restaurant_id,
                customer_ref: customer.clone(),
                items: cart.lines.iter().map(OrderItem::from).collect(),
                total: cart.totals.total,
                customer_address: address.trim().to_string(),
            },
            Utc::now(),
        );
        let order = self.sync.insert_order(order).await?;
        info!(order_id = %order.id(), total = order.total(), "Order created");
        Ok(order)
    }

    pub async fn get(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.sync.fetch_order(id).await
    }

    /// Moves the order one restaurant step forward.
    #[instrument(skip_all, fields(order_id = %id, role = %role))]
    pub async fn advance(&self, id: &OrderId, role: Role) -> Result<Order, OrderError> {
        self.apply(id, "advance", |order, now| {
            transitions::advance(order, role, None, now)
        })
        .await
    }

    /// Like [`advance`](Self::advance), additionally requiring the order to belong to
    /// `restaurant`.
    #[instrument(skip_all, fields(order_id = %id, restaurant = %restaurant))]
    pub async fn advance_for_restaurant(
        &self,
        id: &OrderId,
        restaurant: &RestaurantId,
    ) -> Result<Order, OrderError> {
        self.apply(id, "advance", |order, now| {
            transitions::advance(order, Role::Restaurant, Some(restaurant), now)
        })
        .await
    }

    /// Assigns `agent` to a `ready` order. Exactly one of several concurrent claims wins.
    #[instrument(skip_all, fields(order_id = %id, agent = %agent))]
    pub async fn claim_for_delivery(
        &self,
        id: &OrderId,
        agent: &ActorId,
    ) -> Result<Order, OrderError> {
        self.apply(id, "claim", |order, now| transitions::claim(order, agent, now))
            .await
    }

    #[instrument(skip_all, fields(order_id = %id, agent = %agent))]
    pub async fn complete_delivery(
        &self,
        id: &OrderId,
        agent: &ActorId,
    ) -> Result<Order, OrderError> {
        self.apply(id, "complete", |order, now| {
            transitions::complete(order, agent, now)
        })
        .await
    }

    async fn apply<F>(
        &self,
        id: &OrderId,
        action: &'static str,
        transition: F,
    ) -> Result<Order, OrderError>
    where
        F: Fn(&Order, DateTime<Utc>) -> Result<Order, OrderError>,
    {
        let current = self.sync.fetch_order(id).await?;
        let next = transition(&current, Utc::now()).inspect_err(|e| {
            warn!(action, status = %current.status(), error = %e, "Intent rejected");
        })?;

        match self
            .sync
            .write_order(next, current.version(), current.status())
            .await
        {
            Ok(stored) => {
                info!(action, status = %stored.status(), "Order transitioned");
                Ok(stored)
            }
            Err(OrderError::Conflict(_)) => {
                warn!(action, "Order changed underneath us, re-validating");
                let fresh = self.sync.fetch_order(id).await?;
                transition(&fresh, Utc::now())?;
                Err(OrderError::Conflict(id.clone()))
            }
            Err(e) => Err(e),
        }
    }
}
