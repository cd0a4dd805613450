//! Input side: turning files in a directory into field-bag elements.

pub mod extract;
pub mod scanner;

pub use extract::extract_elements;
pub use scanner::{InputBatch, InputScanner};
