//! Merging field-bags into the store.
//!
//! A bag is first turned into an [`OrderPatch`] (identity, header values,
//! optional item values) without touching shared state. Only a bag that
//! survives that step creates or mutates entities.

use super::{OrderStore, composite_key};
use crate::core::{Field, FieldBag, FieldValue, Result};
use log::warn;
use tracing::{Level, event};

/// Why a bag was dropped without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// `order reference` or `marketplace` is absent or empty.
    MissingIdentity,
    /// `order item number` is present but null or empty.
    EmptyItemNumber,
    /// Item fields carry values but the bag names no item.
    ItemFieldsWithoutItem,
    /// The input element was not a JSON object.
    NotAnObject,
    /// A store lock was poisoned by a panicking writer.
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Merged {
        key: String,
        item_key: Option<String>,
        created_order: bool,
        created_item: bool,
        /// Recognized fields whose values could not be coerced.
        skipped: Vec<Field>,
    },
    Discarded(DiscardReason),
}

impl ApplyOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }
}

/// The changes one bag makes to one order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPatch {
    pub key: String,
    pub header: Vec<(Field, String)>,
    pub item: Option<ItemPatch>,
    pub skipped: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemPatch {
    pub item_key: String,
    pub values: Vec<(Field, FieldValue)>,
}

impl OrderPatch {
    pub fn from_bag(bag: &FieldBag) -> std::result::Result<Self, DiscardReason> {
        let (Some(order_ref), Some(marketplace)) = (
            bag.text(Field::OrderReference),
            bag.text(Field::Marketplace),
        ) else {
            return Err(DiscardReason::MissingIdentity);
        };

        let item_key = match bag.field(Field::ItemNumber) {
            Some(_) => Some(
                bag.text(Field::ItemNumber)
                    .ok_or(DiscardReason::EmptyItemNumber)?,
            ),
            None => None,
        };

        let mut header = Vec::new();
        let mut item_values = Vec::new();
        let mut skipped = Vec::new();

        for (field, raw) in bag.recognized() {
            if field == Field::ItemNumber {
                continue;
            }
            let value = match field.coerce(raw) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(err) => {
                    warn!("skipping field of order {marketplace}-{order_ref}: {err}");
                    skipped.push(field);
                    continue;
                }
            };

            match value {
                FieldValue::Text(text) if !field.is_item_scoped() => header.push((field, text)),
                value => item_values.push((field, value)),
            }
        }

        let item = match item_key {
            Some(item_key) => Some(ItemPatch {
                item_key,
                values: item_values,
            }),
            None if !item_values.is_empty() => {
                return Err(DiscardReason::ItemFieldsWithoutItem);
            }
            None => None,
        };

        Ok(Self {
            key: composite_key(&marketplace, &order_ref),
            header,
            item,
            skipped,
        })
    }
}

impl OrderStore {
    /// Merge one field-bag into the store.
    ///
    /// Bags without a usable identity are discarded and reported through the
    /// outcome, never as an error. Errors only come from poisoned locks.
    pub fn apply(&self, bag: &FieldBag) -> Result<ApplyOutcome> {
        let patch = match OrderPatch::from_bag(bag) {
            Ok(patch) => patch,
            Err(reason) => {
                event!(Level::TRACE, ?reason, "field-bag discarded");
                return Ok(ApplyOutcome::Discarded(reason));
            }
        };

        let OrderPatch {
            key,
            header,
            item,
            skipped,
        } = patch;

        let (order, created_order) = self.get_or_create(&key)?;
        order.update_header(header)?;

        let (item_key, created_item) = match item {
            Some(ItemPatch { item_key, values }) => {
                let created = order.upsert_item(&item_key, values)?;
                (Some(item_key), created)
            }
            None => (None, false),
        };

        event!(
            Level::TRACE,
            order = %key,
            item = ?item_key,
            created_order,
            created_item,
            "field-bag merged"
        );

        Ok(ApplyOutcome::Merged {
            key,
            item_key,
            created_order,
            created_item,
            skipped,
        })
    }
}
