//! Represents a customer order shared by customer, restaurant and delivery agent.
//!
//! # Store Record
//! `Order` implements [`StoredRecord`], so the same value travels unchanged
//! between the remote store, the local cache and the role views.
//!
//! Fields are private. Items and total are frozen at creation; status, delivery agent,
//! `updated_at` and `version` change only through the lifecycle engine.

use crate::model::{ActorId, CartLine, RestaurantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use store_actor::StoredRecord;

/// Type-safe identifier for Orders.
///
/// Store-assigned ids render as `order_<n>`; ids assigned while running local-only are UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn local() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Placeholder carried by a new order until a store assigns its id.
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn is_assigned(&self) -> bool {
        !self.0.is_empty()
    }
}

impl From<u32> for OrderId {
    fn from(id: u32) -> Self {
        Self(format!("order_{id}"))
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order status along the happy path, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    /// The next status a restaurant may move the order to, if any.
    pub fn restaurant_next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready | OrderStatus::OutForDelivery | OrderStatus::Delivered => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == OrderStatus::Delivered
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchased line, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.item_id.clone(),
            name: line.name.clone(),
            unit_price: line.effective_unit_price(),
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    restaurant_id: RestaurantId,
    customer_ref: ActorId,
    items: Vec<OrderItem>,
    total: u64,
    status: OrderStatus,
    customer_address: String,
    delivery_agent_ref: Option<ActorId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

/// Payload for a new order. Status, agent and timestamps are never caller-supplied.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub restaurant_id: RestaurantId,
    pub customer_ref: ActorId,
    pub items: Vec<OrderItem>,
    pub total: u64,
    pub customer_address: String,
}

impl Order {
    /// Builds a `pending` order with no delivery agent and no assigned id.
    pub fn new(params: OrderCreate, now: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::unassigned(),
            restaurant_id: params.restaurant_id,
            customer_ref: params.customer_ref,
            items: params.items,
            total: params.total,
            status: OrderStatus::Pending,
            customer_address: params.customer_address,
            delivery_agent_ref: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn restaurant_id(&self) -> &RestaurantId {
        &self.restaurant_id
    }

    pub fn customer_ref(&self) -> &ActorId {
        &self.customer_ref
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// The amount charged at checkout. Never recomputed from `items`.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn customer_address(&self) -> &str {
        &self.customer_address
    }

    pub fn delivery_agent_ref(&self) -> Option<&ActorId> {
        self.delivery_agent_ref.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Copy with a new status. Used by the lifecycle engine only.
    pub(crate) fn with_status(&self, status: OrderStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Copy with status and delivery agent set together.
    pub(crate) fn with_claim(&self, agent: ActorId, now: DateTime<Utc>) -> Self {
        Self {
            status: OrderStatus::OutForDelivery,
            delivery_agent_ref: Some(agent),
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Server-side query filter. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer: Option<ActorId>,
    pub restaurant: Option<RestaurantId>,
    pub delivery_agent: Option<ActorId>,
    pub status: Option<OrderStatus>,
    /// Only orders with no delivery agent.
    pub unassigned: bool,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_customer(customer: &ActorId) -> Self {
        Self {
            customer: Some(customer.clone()),
            ..Self::default()
        }
    }

    pub fn for_restaurant(restaurant: &RestaurantId) -> Self {
        Self {
            restaurant: Some(restaurant.clone()),
            ..Self::default()
        }
    }

    pub fn for_agent(agent: &ActorId) -> Self {
        Self {
            delivery_agent: Some(agent.clone()),
            ..Self::default()
        }
    }

    /// Ready orders nobody has claimed yet.
    pub fn available_for_delivery() -> Self {
        Self {
            status: Some(OrderStatus::Ready),
            unassigned: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.customer.as_ref().map_or(true, |c| *c == order.customer_ref)
            && self.restaurant.as_ref().map_or(true, |r| *r == order.restaurant_id)
            && self
                .delivery_agent
                .as_ref()
                .map_or(true, |a| order.delivery_agent_ref.as_ref() == Some(a))
            && self.status.map_or(true, |s| s == order.status)
            && (!self.unassigned || order.delivery_agent_ref.is_none())
    }
}

impl StoredRecord for Order {
    type Id = OrderId;
    type Filter = OrderFilter;

    fn id(&self) -> &OrderId {
        &self.id
    }

    fn assign_id(&mut self, id: OrderId) {
        self.id = id;
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn matches(&self, filter: &OrderFilter) -> bool {
        filter.matches(self)
    }
}
