//! Inventory ledger: stock the shop owns but has not put on the shelf.
//!
//! Entries are keyed by item name. Buying more of an item already held
//! merges into the existing entry and moves its cost basis to the
//! quantity-weighted average. Entries disappear when they reach zero.

use crate::{
    error::{SimError, SimResult},
    types::ItemId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryEntry {
    pub item_id: ItemId,
    pub unit_cost: f64,
    pub quantity_owned: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryLedger {
    entries: Vec<InventoryEntry>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add units at `unit_cost`, merging with any existing entry.
    pub fn add_stock(&mut self, item_id: &str, unit_cost: f64, quantity: u32) -> SimResult<()> {
        if quantity == 0 {
            return Err(SimError::InvalidQuantity);
        }
        match self.entries.iter_mut().find(|e| e.item_id == item_id) {
            Some(entry) => {
                let held = entry.quantity_owned as f64;
                let added = quantity as f64;
                entry.unit_cost = (entry.unit_cost * held + unit_cost * added) / (held + added);
                entry.quantity_owned += quantity;
                log::debug!(
                    "inventory: {item_id} now {} @ £{:.2}",
                    entry.quantity_owned,
                    entry.unit_cost
                );
            }
            None => {
                self.entries.push(InventoryEntry {
                    item_id: item_id.to_string(),
                    unit_cost,
                    quantity_owned: quantity,
                });
                log::debug!("inventory: new item {item_id} x{quantity} @ £{unit_cost:.2}");
            }
        }
        Ok(())
    }

    /// Remove `quantity` units and return the cost basis they carried.
    pub fn take(&mut self, item_id: &str, quantity: u32) -> SimResult<f64> {
        if quantity == 0 {
            return Err(SimError::InvalidQuantity);
        }
        let idx = self
            .entries
            .iter()
            .position(|e| e.item_id == item_id)
            .ok_or_else(|| SimError::UnknownItem { item_id: item_id.to_string() })?;

        let entry = &mut self.entries[idx];
        if entry.quantity_owned < quantity {
            return Err(SimError::InsufficientStock {
                item_id:   item_id.to_string(),
                requested: quantity,
                available: entry.quantity_owned,
            });
        }
        entry.quantity_owned -= quantity;
        let unit_cost = entry.unit_cost;
        if entry.quantity_owned == 0 {
            self.entries.remove(idx);
        }
        Ok(unit_cost)
    }

    pub fn get(&self, item_id: &str) -> Option<&InventoryEntry> {
        self.entries.iter().find(|e| e.item_id == item_id)
    }

    pub fn quantity_of(&self, item_id: &str) -> u32 {
        self.get(item_id).map_or(0, |e| e.quantity_owned)
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn total_units(&self) -> u32 {
        self.entries.iter().map(|e| e.quantity_owned).sum()
    }

    /// Value of everything held at cost.
    pub fn stock_value(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.unit_cost * e.quantity_owned as f64)
            .sum()
    }
}
