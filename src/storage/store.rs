use super::Order;
use crate::core::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Separator between marketplace and order reference in a composite key.
pub const KEY_SEPARATOR: &str = "-";

pub fn composite_key(marketplace: &str, order_ref: &str) -> String {
    format!("{marketplace}{KEY_SEPARATOR}{order_ref}")
}

/// Concurrent map of composite key to [`Order`].
///
/// The map lock only guards membership; every order carries its own locks,
/// so a long-lived `Arc<Order>` handle can be mutated while other orders are
/// inserted.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: RwLock<HashMap<String, Arc<Order>>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically fetch the order for `key`, creating it on first sight.
    /// The flag is true when this call created it.
    pub fn get_or_create(&self, key: &str) -> Result<(Arc<Order>, bool)> {
        if let Some(order) = self.orders.read()?.get(key) {
            return Ok((Arc::clone(order), false));
        }

        let mut orders = self.orders.write()?;
        // Another writer may have won between the two locks.
        if let Some(order) = orders.get(key) {
            return Ok((Arc::clone(order), false));
        }
        let order = Arc::new(Order::new(key));
        orders.insert(key.to_string(), Arc::clone(&order));
        Ok((order, true))
    }

    pub fn get(&self, key: &str) -> Result<Option<Arc<Order>>> {
        Ok(self.orders.read()?.get(key).cloned())
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.orders.read()?.contains_key(key))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.orders.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Handles to every order at this instant. The map lock is released
    /// before the caller touches any order.
    pub fn snapshot(&self) -> Result<Vec<Arc<Order>>> {
        Ok(self.orders.read()?.values().cloned().collect())
    }

    /// Total items still waiting to be flushed across all orders.
    pub fn pending_items(&self) -> Result<usize> {
        self.snapshot()?
            .iter()
            .map(|order| order.item_count())
            .sum()
    }
}
