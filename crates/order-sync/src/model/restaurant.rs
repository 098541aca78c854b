//! Restaurants and the menus customers order from.
//!
//! The catalog is a small collection read by every role and edited only by a restaurant's
//! own staff. Each [`MenuItem`] on a menu carries the id of the restaurant that offers it.

use crate::error::OrderError;
use crate::model::{MenuItem, RestaurantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub cuisine: String,
    /// Free-form estimate shown to customers, e.g. `25-35 min`.
    pub delivery_time: String,
    pub menu: Vec<MenuItem>,
}

impl Restaurant {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cuisine: impl Into<String>,
        delivery_time: impl Into<String>,
    ) -> Self {
        Self {
            id: RestaurantId::new(id),
            name: name.into(),
            cuisine: cuisine.into(),
            delivery_time: delivery_time.into(),
            menu: Vec::new(),
        }
    }

    /// Adds a dish to the menu, owned by this restaurant.
    pub fn with_item(mut self, id: impl Into<String>, name: impl Into<String>, price: u64) -> Self {
        self.menu.push(MenuItem::new(id, name, price, self.id.clone()));
        self
    }

    pub fn menu_item(&self, item_id: &str) -> Option<&MenuItem> {
        self.menu.iter().find(|item| item.id == item_id)
    }

    /// Replaces the menu.
    ///
    /// Fails with `Validation` if an item belongs to another restaurant or an item id
    /// appears twice.
    pub fn replace_menu(&mut self, menu: Vec<MenuItem>) -> Result<(), OrderError> {
        if let Some(stray) = menu.iter().find(|item| item.restaurant_id != self.id) {
            return Err(OrderError::Validation(format!(
                "Menu item {} belongs to restaurant {}, not {}",
                stray.id, stray.restaurant_id, self.id
            )));
        }
        for (i, item) in menu.iter().enumerate() {
            if menu[..i].iter().any(|earlier| earlier.id == item.id) {
                return Err(OrderError::Validation(format!(
                    "Menu item {} is listed twice",
                    item.id
                )));
            }
        }
        self.menu = menu;
        Ok(())
    }

    /// The catalog a fresh device starts with.
    pub fn demo_catalog() -> Vec<Restaurant> {
        vec![
            Restaurant::new("1", "Pizza Palace", "Italian", "25-35 min")
                .with_item("1", "Margherita Pizza", 299)
                .with_item("2", "Pepperoni Pizza", 349),
            Restaurant::new("2", "Burger Barn", "American", "20-30 min")
                .with_item("3", "Classic Burger", 259),
        ]
    }
}
