//! Domain models for the Cosmetics Warehouse Management system

mod catalog;
mod order;
mod warehouse;

pub use catalog::*;
pub use order::*;
pub use warehouse::*;
