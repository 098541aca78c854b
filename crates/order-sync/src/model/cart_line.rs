//! Cart lines and the customization pricing that feeds them.
//!
//! A [`CartLine`] is one menu item plus quantity, optionally customized. Customization is
//! priced once, when it is built: `computed_unit_price = base + size modifier + toppings`.

use crate::error::OrderError;
use crate::model::RestaurantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Price modifier for a large portion.
pub const LARGE_SIZE_MODIFIER: u64 = 50;

/// Extra toppings on offer and their price per unit.
pub const TOPPINGS: &[(&str, u64)] = &[
    ("extra-cheese", 30),
    ("mushrooms", 25),
    ("pepperoni", 40),
    ("bell-peppers", 20),
    ("onions", 15),
    ("olives", 25),
    ("jalapenos", 20),
    ("tomatoes", 15),
];

/// Price of a topping, or `None` if the id is not on the menu.
pub fn topping_price(topping: &str) -> Option<u64> {
    TOPPINGS
        .iter()
        .find(|(id, _)| *id == topping)
        .map(|(_, price)| *price)
}

/// A selectable dish as offered by a restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price: u64,
    pub restaurant_id: RestaurantId,
}

impl MenuItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: u64,
        restaurant_id: RestaurantId,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            restaurant_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    #[default]
    Regular,
    Large,
}

impl Size {
    pub fn modifier(self) -> u64 {
        match self {
            Size::Regular => 0,
            Size::Large => LARGE_SIZE_MODIFIER,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpiceLevel {
    Mild,
    #[default]
    Medium,
    Hot,
}

/// A customer's choices for one dish, with the resulting unit price frozen in.
///
/// Remembers the item and base price it was priced from, so it cannot be attached to a
/// different dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customization {
    item_id: String,
    base_price: u64,
    size: Size,
    spice_level: SpiceLevel,
    extra_toppings: BTreeSet<String>,
    special_requests: String,
    computed_unit_price: u64,
}

impl Customization {
    /// Prices a customization of `item`.
    ///
    /// Fails with `Validation` if a topping id is not on the menu.
    pub fn new(
        item: &MenuItem,
        size: Size,
        spice_level: SpiceLevel,
        extra_toppings: impl IntoIterator<Item = impl Into<String>>,
        special_requests: impl Into<String>,
    ) -> Result<Self, OrderError> {
        let extra_toppings: BTreeSet<String> =
            extra_toppings.into_iter().map(Into::into).collect();

        let mut computed_unit_price = item.price.checked_add(size.modifier());
        for topping in &extra_toppings {
            let price = topping_price(topping)
                .ok_or_else(|| OrderError::Validation(format!("Unknown topping: {topping}")))?;
            computed_unit_price = computed_unit_price.and_then(|p| p.checked_add(price));
        }
        let computed_unit_price = computed_unit_price
            .ok_or_else(|| OrderError::Validation(format!("Price of {} is too large", item.name)))?;

        Ok(Self {
            item_id: item.id.clone(),
            base_price: item.price,
            size,
            spice_level,
            extra_toppings,
            special_requests: special_requests.into(),
            computed_unit_price,
        })
    }

    /// Whether this customization was priced from `item` as it is offered now.
    pub fn is_for(&self, item: &MenuItem) -> bool {
        self.item_id == item.id && self.base_price == item.price
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn spice_level(&self) -> SpiceLevel {
        self.spice_level
    }

    pub fn extra_toppings(&self) -> &BTreeSet<String> {
        &self.extra_toppings
    }

    pub fn special_requests(&self) -> &str {
        &self.special_requests
    }

    pub fn computed_unit_price(&self) -> u64 {
        self.computed_unit_price
    }
}

/// Identity of a cart line. Adding an item with an existing key merges into that line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub item_id: String,
    pub restaurant_id: RestaurantId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: String,
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
    pub restaurant_id: RestaurantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<Customization>,
}

impl CartLine {
    pub fn key(&self) -> LineKey {
        LineKey {
            item_id: self.item_id.clone(),
            restaurant_id: self.restaurant_id.clone(),
        }
    }

    /// Price charged per unit: the customized price when present, else the base price.
    pub fn effective_unit_price(&self) -> u64 {
        self.customization
            .as_ref()
            .map_or(self.unit_price, Customization::computed_unit_price)
    }

    /// `None` when the product does not fit in a `u64`.
    pub fn checked_line_total(&self) -> Option<u64> {
        self.effective_unit_price().checked_mul(u64::from(self.quantity))
    }

    pub fn line_total(&self) -> u64 {
        self.effective_unit_price().saturating_mul(u64::from(self.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pizza() -> MenuItem {
        MenuItem::new("1", "Margherita Pizza", 299, RestaurantId::new("r1"))
    }

    #[test]
    fn test_customization_price_adds_size_and_toppings() {
        let custom = Customization::new(
            &pizza(),
            Size::Large,
            SpiceLevel::Hot,
            ["extra-cheese", "olives"],
            "no basil",
        )
        .unwrap();
        assert_eq!(custom.computed_unit_price(), 299 + 50 + 30 + 25);
        assert_eq!(custom.special_requests(), "no basil");
    }

    #[test]
    fn test_duplicate_toppings_are_charged_once() {
        let custom = Customization::new(
            &pizza(),
            Size::Regular,
            SpiceLevel::default(),
            ["onions", "onions"],
            "",
        )
        .unwrap();
        assert_eq!(custom.extra_toppings().len(), 1);
        assert_eq!(custom.computed_unit_price(), 299 + 15);
    }

    #[test]
    fn test_unknown_topping_is_rejected() {
        let result = Customization::new(
            &pizza(),
            Size::Regular,
            SpiceLevel::Mild,
            ["pineapple"],
            "",
        );
        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[test]
    fn test_customization_remembers_its_item() {
        let custom =
            Customization::new(&pizza(), Size::Large, SpiceLevel::Mild, ["onions"], "").unwrap();
        assert!(custom.is_for(&pizza()));

        let naan = MenuItem::new("4", "Garlic Naan", 59, RestaurantId::new("r1"));
        assert!(!custom.is_for(&naan));

        // Same dish, repriced since the customization was built
        let repriced = MenuItem::new("1", "Margherita Pizza", 319, RestaurantId::new("r1"));
        assert!(!custom.is_for(&repriced));
    }

    #[test]
    fn test_line_total_saturates_instead_of_overflowing() {
        let item = MenuItem::new("7", "Gold Leaf Thali", u64::MAX / 2, RestaurantId::new("r1"));
        let line = CartLine {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity: 3,
            restaurant_id: item.restaurant_id.clone(),
            customization: None,
        };
        assert_eq!(line.checked_line_total(), None);
        assert_eq!(line.line_total(), u64::MAX);
    }

    #[test]
    fn test_effective_price_prefers_customization() {
        let item = pizza();
        let mut line = CartLine {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity: 2,
            restaurant_id: item.restaurant_id.clone(),
            customization: None,
        };
        assert_eq!(line.line_total(), 598);

        let large = Customization::new(&item, Size::Large, SpiceLevel::Mild, Vec::<String>::new(), "");
        line.customization = Some(large.unwrap());
        assert_eq!(line.effective_unit_price(), 349);
        assert_eq!(line.line_total(), 698);
    }
}
