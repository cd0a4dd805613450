pub mod error;
pub mod field;

pub use error::{CollateError, Result};
pub use field::{Field, FieldBag, FieldValue, HEADER_FIELDS, ITEM_FIELDS};
