//! Warehouse priority and stock models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of a warehouse in the consumption ranking (1 is drawn from first)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarehousePriority {
    pub warehouse_id: Uuid,
    pub priority_order: i32,
}

/// Stock of one ingredient held in one warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarehouseStock {
    pub warehouse_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity_kg: Decimal,
}

/// Warehouse ranked first, if any ranking is configured
pub fn top_priority_warehouse(priorities: &[WarehousePriority]) -> Option<Uuid> {
    priorities
        .iter()
        .min_by_key(|p| p.priority_order)
        .map(|p| p.warehouse_id)
}

/// Build a dense 1..n ranking from an ordered list of warehouse ids
pub fn dense_priorities(ordered: &[Uuid]) -> Vec<WarehousePriority> {
    ordered
        .iter()
        .enumerate()
        .map(|(idx, id)| WarehousePriority {
            warehouse_id: *id,
            priority_order: idx as i32 + 1,
        })
        .collect()
}
