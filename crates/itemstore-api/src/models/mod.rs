//! Data types for items and field values.
//!
//! These types describe the store's fixed object model. The query engine
//! consumes them but never defines new ones.

mod decimal;
mod item;
mod value;

pub use decimal::*;
pub use item::*;
pub use value::*;
