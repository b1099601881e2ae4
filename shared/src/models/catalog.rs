//! Ingredient and product catalog models
//!
//! The catalog is owned by the surrounding CRUD screens; the order engine
//! only ever reads it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw cosmetic ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    /// Cost per kg in whole currency units, unset means not yet priced
    pub unit_cost: Option<Decimal>,
}

impl Ingredient {
    /// Unit cost used when freezing an order, an unpriced ingredient costs 0
    pub fn effective_unit_cost(&self) -> Decimal {
        self.unit_cost.unwrap_or(Decimal::ZERO)
    }
}

/// One row of a product formula
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeComponent {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    /// kg of this ingredient per 100 kg of finished product
    pub percent_per_kg: Decimal,
    /// Current catalog cost per kg
    pub unit_cost: Option<Decimal>,
}

impl RecipeComponent {
    pub fn effective_unit_cost(&self) -> Decimal {
        self.unit_cost.unwrap_or(Decimal::ZERO)
    }
}

/// A finished product and its formula
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub product_id: Uuid,
    pub product_name: String,
    pub components: Vec<RecipeComponent>,
}
