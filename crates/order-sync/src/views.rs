//! # Role-Scoped Query Views
//!
//! Read-only projections of the order collection, one per role. The builders are pure
//! functions over a slice of orders; the async helpers fetch through the [`SyncLayer`] and
//! report where the data came from.

use crate::error::OrderError;
use crate::model::{ActorId, Order, OrderFilter, OrderStatus, RestaurantId};
use crate::sync::{DataSource, SyncLayer};

/// A customer's own orders, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerView {
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantView {
    /// `pending`, `confirmed` or `preparing`.
    pub active: Vec<Order>,
    pub ready: Vec<Order>,
    /// `out_for_delivery` or `delivered`.
    pub completed: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryView {
    /// Ready and unclaimed, oldest first.
    pub available: Vec<Order>,
    /// Claimed by this agent and still on the road.
    pub active: Vec<Order>,
    /// Delivered by this agent.
    pub completed: Vec<Order>,
}

/// What the signed-in actor sees.
#[derive(Debug, Clone, PartialEq)]
pub enum Dashboard {
    Customer(CustomerView),
    Restaurant(RestaurantView),
    Delivery(DeliveryView),
}

/// A view plus the source its data was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<V> {
    pub view: V,
    pub source: DataSource,
}

pub fn customer_view(orders: &[Order], customer: &ActorId) -> CustomerView {
    let mut mine: Vec<Order> = orders
        .iter()
        .filter(|o| o.customer_ref() == customer)
        .cloned()
        .collect();
    mine.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    CustomerView { orders: mine }
}

pub fn restaurant_view(orders: &[Order], restaurant: &RestaurantId) -> RestaurantView {
    let mut view = RestaurantView {
        active: Vec::new(),
        ready: Vec::new(),
        completed: Vec::new(),
    };
    for order in orders.iter().filter(|o| o.restaurant_id() == restaurant) {
        let bucket = match order.status() {
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Preparing => {
                &mut view.active
            }
            OrderStatus::Ready => &mut view.ready,
            OrderStatus::OutForDelivery | OrderStatus::Delivered => &mut view.completed,
        };
        bucket.push(order.clone());
    }
    view
}

pub fn delivery_view(orders: &[Order], agent: &ActorId) -> DeliveryView {
    let available_filter = OrderFilter::available_for_delivery();
    let mut available: Vec<Order> = orders
        .iter()
        .filter(|o| available_filter.matches(o))
        .cloned()
        .collect();
    // A ready order's last update is the moment it became ready
    available.sort_by(|a, b| {
        a.updated_at()
            .cmp(&b.updated_at())
            .then_with(|| a.created_at().cmp(&b.created_at()))
    });

    let (completed, active): (Vec<Order>, Vec<Order>) = orders
        .iter()
        .filter(|o| o.delivery_agent_ref() == Some(agent))
        .cloned()
        .partition(|o| o.status().is_terminal());

    DeliveryView {
        available,
        active,
        completed,
    }
}

pub async fn load_customer_view(
    sync: &SyncLayer,
    customer: &ActorId,
) -> Result<Sourced<CustomerView>, OrderError> {
    let snapshot = sync.orders(OrderFilter::for_customer(customer)).await?;
    Ok(Sourced {
        view: customer_view(&snapshot.orders, customer),
        source: snapshot.source,
    })
}

pub async fn load_restaurant_view(
    sync: &SyncLayer,
    restaurant: &RestaurantId,
) -> Result<Sourced<RestaurantView>, OrderError> {
    let snapshot = sync.orders(OrderFilter::for_restaurant(restaurant)).await?;
    Ok(Sourced {
        view: restaurant_view(&snapshot.orders, restaurant),
        source: snapshot.source,
    })
}

/// Needs both unclaimed and claimed orders, so it reads the whole collection once.
pub async fn load_delivery_view(
    sync: &SyncLayer,
    agent: &ActorId,
) -> Result<Sourced<DeliveryView>, OrderError> {
    let snapshot = sync.orders(OrderFilter::all()).await?;
    Ok(Sourced {
        view: delivery_view(&snapshot.orders, agent),
        source: snapshot.source,
    })
}
