//! Shared types and models for the Cosmetics Warehouse Management system
//!
//! This crate contains the pure order engine (recipe snapshots, feasibility
//! analysis and apply planning) shared between the backend and the browser
//! (via WASM). Nothing in here performs I/O.

pub mod application;
pub mod feasibility;
pub mod models;
pub mod snapshot;
pub mod types;
pub mod validation;

pub use application::*;
pub use feasibility::*;
pub use models::*;
pub use snapshot::*;
pub use types::*;
pub use validation::*;
