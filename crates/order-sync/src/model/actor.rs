//! Identities of the three roles that share an order.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for a signed-in actor (customer, restaurant account, or delivery agent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type-safe identifier for Restaurants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RestaurantId(pub String);

impl RestaurantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Display for RestaurantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Restaurant,
    Delivery,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::Customer => "customer",
            Role::Restaurant => "restaurant",
            Role::Delivery => "delivery",
        })
    }
}

/// The current actor as reported by the auth collaborator.
///
/// `restaurant_id` is only meaningful for [`Role::Restaurant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
    pub restaurant_id: Option<RestaurantId>,
}

impl Actor {
    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(id),
            role: Role::Customer,
            restaurant_id: None,
        }
    }

    pub fn restaurant(id: impl Into<String>, restaurant_id: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(id),
            role: Role::Restaurant,
            restaurant_id: Some(RestaurantId::new(restaurant_id)),
        }
    }

    pub fn delivery(id: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(id),
            role: Role::Delivery,
            restaurant_id: None,
        }
    }
}
