use crate::core::{Field, FieldValue, HEADER_FIELDS, Result};
use std::collections::HashMap;
use std::sync::RwLock;

/// Price of an item whose `price per unit` has not been seen yet.
pub const UNSET_PRICE: f64 = -1.0;

/// Order-level attributes. Empty string means "not seen yet".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderHeader {
    pub order_ref: String,
    pub marketplace: String,
    pub name: String,
    pub surname: String,
    pub postal_service: String,
    pub postcode: String,
}

impl OrderHeader {
    /// True once every header field carries a value.
    pub fn is_complete(&self) -> bool {
        HEADER_FIELDS
            .into_iter()
            .all(|field| self.get(field).is_some_and(|value| !value.is_empty()))
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::OrderReference => &self.order_ref,
            Field::Marketplace => &self.marketplace,
            Field::Name => &self.name,
            Field::Surname => &self.surname,
            Field::PostalService => &self.postal_service,
            Field::Postcode => &self.postcode,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Assign one header field. Empty values and non-header fields are ignored,
    /// so a set field never goes back to empty.
    pub fn assign(&mut self, field: Field, value: String) {
        if value.is_empty() {
            return;
        }
        let slot = match field {
            Field::OrderReference => &mut self.order_ref,
            Field::Marketplace => &mut self.marketplace,
            Field::Name => &mut self.name,
            Field::Surname => &mut self.surname,
            Field::PostalService => &mut self.postal_service,
            Field::Postcode => &mut self.postcode,
            _ => return,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub sku: String,
    pub price: f64,
    pub quantity: i32,
}

impl Default for OrderItem {
    fn default() -> Self {
        Self {
            sku: String::new(),
            price: UNSET_PRICE,
            quantity: 0,
        }
    }
}

impl OrderItem {
    pub fn is_ready(&self) -> bool {
        !self.sku.is_empty() && self.price >= 0.0 && self.quantity > 0
    }

    /// Assign one coerced item value. Mismatched pairs are ignored.
    pub fn assign(&mut self, field: Field, value: FieldValue) {
        match (field, value) {
            (Field::Sku, FieldValue::Text(sku)) if !sku.is_empty() => self.sku = sku,
            (Field::PricePerUnit, FieldValue::Price(price)) => self.price = price,
            (Field::Quantity, FieldValue::Quantity(quantity)) => self.quantity = quantity,
            _ => {}
        }
    }
}

/// Result of the completeness check for one order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyItems {
    pub ready: bool,
    pub item_keys: Vec<String>,
}

/// One item that is ready to be written, captured together with the header
/// it will be rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyLine {
    pub item_key: String,
    pub item: OrderItem,
}

/// Everything a flush needs for one order, copied out of the locks.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadySnapshot {
    pub header: OrderHeader,
    pub lines: Vec<ReadyLine>,
}

/// An order and its pending items.
///
/// Header and item map sit behind separate locks so that ingestion of
/// header-only fragments never contends with item updates.
#[derive(Debug)]
pub struct Order {
    key: String,
    header: RwLock<OrderHeader>,
    items: RwLock<HashMap<String, OrderItem>>,
}

impl Order {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: RwLock::new(OrderHeader::default()),
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Composite key, `<marketplace>-<order reference>`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn header(&self) -> Result<OrderHeader> {
        Ok(self.header.read()?.clone())
    }

    pub fn item(&self, item_key: &str) -> Result<Option<OrderItem>> {
        Ok(self.items.read()?.get(item_key).cloned())
    }

    pub fn item_count(&self) -> Result<usize> {
        Ok(self.items.read()?.len())
    }

    pub fn item_keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read()?.keys().cloned().collect())
    }

    /// Apply header values under a single write lock.
    pub fn update_header(&self, values: Vec<(Field, String)>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut header = self.header.write()?;
        for (field, value) in values {
            header.assign(field, value);
        }
        Ok(())
    }

    /// Get-or-create an item and apply its values under a single write lock.
    /// Returns true when the item did not exist before.
    pub fn upsert_item(&self, item_key: &str, values: Vec<(Field, FieldValue)>) -> Result<bool> {
        let mut items = self.items.write()?;
        let created = !items.contains_key(item_key);
        let item = items.entry(item_key.to_string()).or_default();
        for (field, value) in values {
            item.assign(field, value);
        }
        Ok(created)
    }

    /// Decide which items can be emitted right now.
    ///
    /// Nothing is ready until the header is complete and at least one item
    /// exists; after that, every item passing [`OrderItem::is_ready`] is.
    pub fn ready_items(&self) -> Result<ReadyItems> {
        let header_complete = self.header.read()?.is_complete();
        let items = self.items.read()?;
        if !header_complete || items.is_empty() {
            return Ok(ReadyItems::default());
        }

        let mut item_keys: Vec<String> = items
            .iter()
            .filter(|(_, item)| item.is_ready())
            .map(|(key, _)| key.clone())
            .collect();
        item_keys.sort();

        Ok(ReadyItems {
            ready: !item_keys.is_empty(),
            item_keys,
        })
    }

    /// Copy the header and the ready items out for rendering, or `None` when
    /// nothing is ready.
    pub fn ready_snapshot(&self) -> Result<Option<ReadySnapshot>> {
        let ReadyItems { ready, item_keys } = self.ready_items()?;
        if !ready {
            return Ok(None);
        }

        let header = self.header()?;
        let items = self.items.read()?;
        let lines: Vec<ReadyLine> = item_keys
            .into_iter()
            .filter_map(|item_key| {
                let item = items.get(&item_key)?.clone();
                Some(ReadyLine { item_key, item })
            })
            .collect();

        if lines.is_empty() {
            return Ok(None);
        }
        Ok(Some(ReadySnapshot { header, lines }))
    }

    /// Drop items that were written. Returns how many were removed.
    pub fn remove_items<'a>(&self, item_keys: impl IntoIterator<Item = &'a str>) -> Result<usize> {
        let mut items = self.items.write()?;
        Ok(item_keys
            .into_iter()
            .filter(|key| items.remove(*key).is_some())
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_header(order: &Order) {
        order
            .update_header(vec![
                (Field::OrderReference, "A1".into()),
                (Field::Marketplace, "M".into()),
                (Field::Name, "Jo".into()),
                (Field::Surname, "Doe".into()),
                (Field::PostalService, "P1".into()),
                (Field::Postcode, "Z1".into()),
            ])
            .unwrap();
    }

    fn ready_item() -> Vec<(Field, FieldValue)> {
        vec![
            (Field::Sku, FieldValue::Text("S1".into())),
            (Field::PricePerUnit, FieldValue::Price(9.5)),
            (Field::Quantity, FieldValue::Quantity(2)),
        ]
    }

    #[test]
    fn test_item_defaults_are_not_ready() {
        let item = OrderItem::default();
        assert_eq!(item.price, UNSET_PRICE);
        assert_eq!(item.quantity, 0);
        assert!(!item.is_ready());
    }

    #[test]
    fn test_item_readiness_boundaries() {
        let mut item = OrderItem {
            sku: "S1".into(),
            price: 0.0,
            quantity: 1,
        };
        assert!(item.is_ready(), "zero price is a valid price");

        item.quantity = 0;
        assert!(!item.is_ready());

        item.quantity = 1;
        item.sku.clear();
        assert!(!item.is_ready());
    }

    #[test]
    fn test_header_never_reset_to_empty() {
        let mut header = OrderHeader::default();
        header.assign(Field::Name, "Jo".into());
        header.assign(Field::Name, String::new());
        assert_eq!(header.name, "Jo");

        header.assign(Field::Name, "Al".into());
        assert_eq!(header.name, "Al");
    }

    #[test]
    fn test_incomplete_header_is_not_ready() {
        let order = Order::new("M-A1");
        order.upsert_item("1", ready_item()).unwrap();
        order
            .update_header(vec![(Field::Name, "Jo".into())])
            .unwrap();

        assert_eq!(order.ready_items().unwrap(), ReadyItems::default());
    }

    #[test]
    fn test_complete_header_without_items_is_not_ready() {
        let order = Order::new("M-A1");
        complete_header(&order);
        assert!(!order.ready_items().unwrap().ready);
    }

    #[test]
    fn test_only_ready_items_are_listed() {
        let order = Order::new("M-A1");
        complete_header(&order);
        order.upsert_item("2", vec![(Field::Sku, FieldValue::Text("S2".into()))]).unwrap();
        assert!(!order.ready_items().unwrap().ready);

        order.upsert_item("1", ready_item()).unwrap();
        let ready = order.ready_items().unwrap();
        assert!(ready.ready);
        assert_eq!(ready.item_keys, vec!["1".to_string()]);
    }

    #[test]
    fn test_remove_items_counts_only_existing() {
        let order = Order::new("M-A1");
        order.upsert_item("1", ready_item()).unwrap();
        assert_eq!(order.remove_items(["1", "9"]).unwrap(), 1);
        assert_eq!(order.item_count().unwrap(), 0);
    }
}
