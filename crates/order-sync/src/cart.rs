//! # Cart Aggregator
//!
//! Accumulates menu items into [`CartLine`]s until checkout.
//!
//! Lines are keyed by `(item_id, restaurant_id)`; adding an item that already has a line
//! sums the quantities and re-prices the line with the newest customization (last-write
//! pricing). A cart holds items from one restaurant at a time.
//!
//! Every mutation persists the whole cart through the [`SyncLayer`], which emits
//! `CartChanged` so other views refresh without polling.

use crate::engine::LifecycleEngine;
use crate::error::OrderError;
use crate::model::{ActorId, CartLine, Customization, LineKey, MenuItem, Order, RestaurantId};
use crate::sync::SyncLayer;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Flat delivery fee, in currency units.
pub const DELIVERY_FEE: u64 = 99;

/// Tax rate, in percent of the subtotal.
pub const TAX_PERCENT: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: u64,
    pub delivery_fee: u64,
    pub tax: u64,
    pub total: u64,
}

impl CartTotals {
    pub fn from_subtotal(subtotal: u64) -> Self {
        // Half-up rounding to a whole currency unit
        let tax = subtotal.saturating_mul(TAX_PERCENT).saturating_add(50) / 100;
        Self {
            subtotal,
            delivery_fee: DELIVERY_FEE,
            tax,
            total: subtotal.saturating_add(DELIVERY_FEE).saturating_add(tax),
        }
    }

    /// Totals for `lines`, or `Validation` when any amount would overflow.
    pub fn checked(lines: &[CartLine]) -> Result<Self, OrderError> {
        let too_large = || OrderError::Validation("Cart total is too large".to_string());

        let mut subtotal: u64 = 0;
        for line in lines {
            let line_total = line.checked_line_total().ok_or_else(too_large)?;
            subtotal = subtotal.checked_add(line_total).ok_or_else(too_large)?;
        }
        let tax = subtotal
            .checked_mul(TAX_PERCENT)
            .and_then(|t| t.checked_add(50))
            .ok_or_else(too_large)?
            / 100;
        let total = subtotal
            .checked_add(DELIVERY_FEE)
            .and_then(|t| t.checked_add(tax))
            .ok_or_else(too_large)?;

        Ok(Self {
            subtotal,
            delivery_fee: DELIVERY_FEE,
            tax,
            total,
        })
    }
}

/// Immutable copy of the cart handed to order creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub struct Cart {
    lines: Vec<CartLine>,
    sync: Arc<SyncLayer>,
}

impl Cart {
    /// Restores the last persisted cart.
    pub fn load(sync: Arc<SyncLayer>) -> Result<Self, OrderError> {
        let lines = sync.load_cart()?;
        debug!(lines = lines.len(), "Cart restored");
        Ok(Self { lines, sync })
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The restaurant every line belongs to, if the cart is not empty.
    pub fn restaurant(&self) -> Option<&RestaurantId> {
        self.lines.first().map(|line| &line.restaurant_id)
    }

    #[instrument(skip(self, item, customization), fields(item_id = %item.id))]
    pub fn add_line(
        &mut self,
        item: &MenuItem,
        quantity: u32,
        customization: Option<Customization>,
    ) -> Result<(), OrderError> {
        if quantity < 1 {
            return Err(OrderError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if let Some(custom) = &customization {
            if !custom.is_for(item) {
                return Err(OrderError::Validation(format!(
                    "Customization was priced for item {}, not {}",
                    custom.item_id(),
                    item.id
                )));
            }
        }
        if let Some(current) = self.restaurant() {
            if *current != item.restaurant_id {
                return Err(OrderError::Validation(format!(
                    "Cart already holds items from restaurant {current}; \
                     clear it before ordering from {}",
                    item.restaurant_id
                )));
            }
        }

        let mut next = self.lines.clone();
        match next
            .iter_mut()
            .find(|l| l.item_id == item.id && l.restaurant_id == item.restaurant_id)
        {
            Some(line) => {
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    OrderError::Validation(format!("Too many of {} in the cart", item.name))
                })?;
                line.name = item.name.clone();
                line.unit_price = item.price;
                line.customization = customization;
            }
            None => next.push(CartLine {
                item_id: item.id.clone(),
                name: item.name.clone(),
                unit_price: item.price,
                quantity,
                restaurant_id: item.restaurant_id.clone(),
                customization,
            }),
        }
        self.commit(next)
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<(), OrderError> {
        if quantity == 0 {
            return self.remove_line(key);
        }
        let mut next = self.lines.clone();
        let Some(line) = next.iter_mut().find(|l| l.key() == *key) else {
            return Ok(());
        };
        line.quantity = quantity;
        self.commit(next)
    }

    /// Removes a line. Absent keys are ignored.
    pub fn remove_line(&mut self, key: &LineKey) -> Result<(), OrderError> {
        if !self.lines.iter().any(|l| l.key() == *key) {
            return Ok(());
        }
        let next = self
            .lines
            .iter()
            .filter(|l| l.key() != *key)
            .cloned()
            .collect();
        self.commit(next)
    }

    pub fn compute_totals(&self) -> CartTotals {
        let subtotal = self
            .lines
            .iter()
            .fold(0u64, |sum, line| sum.saturating_add(line.line_total()));
        CartTotals::from_subtotal(subtotal)
    }

    pub fn clear(&mut self) -> Result<(), OrderError> {
        self.commit(Vec::new())
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            lines: self.lines.clone(),
            totals: self.compute_totals(),
        }
    }

    /// Creates the order and, only if that succeeds, empties the cart.
    #[instrument(skip_all, fields(customer = %customer))]
    pub async fn checkout(
        &mut self,
        engine: &LifecycleEngine,
        address: &str,
        customer: &ActorId,
    ) -> Result<Order, OrderError> {
        let order = engine.create(&self.snapshot(), address, customer).await?;
        self.clear()?;
        info!(order_id = %order.id(), "Checkout complete");
        Ok(order)
    }

    /// Persists first so the in-memory cart never runs ahead of the cache.
    fn commit(&mut self, next: Vec<CartLine>) -> Result<(), OrderError> {
        CartTotals::checked(&next)?;
        self.sync.save_cart(&next)?;
        self.lines = next;
        Ok(())
    }
}
