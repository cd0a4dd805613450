pub mod merge;
pub mod order;
pub mod store;

pub use merge::{ApplyOutcome, DiscardReason, ItemPatch, OrderPatch};
pub use order::{Order, OrderHeader, OrderItem, ReadyItems, ReadyLine, ReadySnapshot, UNSET_PRICE};
pub use store::{KEY_SEPARATOR, OrderStore, composite_key};
