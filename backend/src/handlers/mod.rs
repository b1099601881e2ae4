//! HTTP handlers

pub mod feasibility;
pub mod health;
pub mod ingredient_order;
pub mod order;
pub mod warehouse;

pub use feasibility::*;
pub use health::*;
pub use ingredient_order::*;
pub use order::*;
pub use warehouse::*;
