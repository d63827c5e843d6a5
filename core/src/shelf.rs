//! Shelf pricing table: what is on sale and at what price.
//!
//! Listings for the same item at the same price merge; the same item at a
//! different price is a separate listing. Customers take the first
//! listing (placement order) that still has stock.

use crate::{
    error::{SimError, SimResult},
    types::ItemId,
};
use serde::{Deserialize, Serialize};

/// Prices closer than this are treated as the same shelf price.
const PRICE_EPSILON: f64 = 1e-9;

/// Markup at or below which a price reads as healthy.
pub const IDEAL_MARKUP: f64 = 1.25;
/// Markup above which a price reads as overpriced.
pub const MAX_MARKUP: f64 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShelfListing {
    pub item_id: ItemId,
    pub selling_price: f64,
    pub quantity_on_shelf: u32,
    /// Wholesale cost basis the stock was shelved at.
    pub reference_cost: f64,
    /// Total units ever placed on this listing.
    pub initial_quantity: u32,
}

impl ShelfListing {
    pub fn profit_per_item(&self) -> f64 {
        self.selling_price - self.reference_cost
    }

    pub fn demand_band(&self) -> DemandBand {
        DemandBand::classify(self.selling_price, self.reference_cost)
    }
}

/// How customers are likely to see a price relative to its cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DemandBand {
    /// At or below the ideal markup; nearly every customer accepts it.
    Healthy,
    /// Above ideal, within the upper bound; only tolerant customers pay.
    Stretched,
    /// Beyond the upper bound.
    Overpriced,
}

impl DemandBand {
    pub fn classify(price: f64, cost: f64) -> Self {
        if price <= cost * IDEAL_MARKUP {
            Self::Healthy
        } else if price <= cost * MAX_MARKUP {
            Self::Stretched
        } else {
            Self::Overpriced
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfTable {
    listings: Vec<ShelfListing>,
}

impl ShelfTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `quantity` units on sale at `price`.
    pub fn place(
        &mut self,
        item_id:        &str,
        quantity:       u32,
        price:          f64,
        reference_cost: f64,
    ) -> SimResult<()> {
        validate_price(price)?;
        if quantity == 0 {
            return Err(SimError::InvalidQuantity);
        }
        match self.find_listing_mut(item_id, price) {
            Some(listing) => {
                let held = listing.quantity_on_shelf as f64;
                let added = quantity as f64;
                listing.reference_cost =
                    (listing.reference_cost * held + reference_cost * added) / (held + added);
                listing.quantity_on_shelf += quantity;
                listing.initial_quantity += quantity;
            }
            None => self.listings.push(ShelfListing {
                item_id: item_id.to_string(),
                selling_price: price,
                quantity_on_shelf: quantity,
                reference_cost,
                initial_quantity: quantity,
            }),
        }
        Ok(())
    }

    /// Take `quantity` units back off the listing at `price`.
    /// Returns the reference cost of the removed units.
    pub fn remove(&mut self, item_id: &str, price: f64, quantity: u32) -> SimResult<f64> {
        if quantity == 0 {
            return Err(SimError::InvalidQuantity);
        }
        let idx = self
            .listings
            .iter()
            .position(|l| l.item_id == item_id && same_price(l.selling_price, price))
            .ok_or_else(|| SimError::ListingNotFound { item_id: item_id.to_string(), price })?;

        let listing = &mut self.listings[idx];
        if listing.quantity_on_shelf < quantity {
            return Err(SimError::InsufficientStock {
                item_id:   item_id.to_string(),
                requested: quantity,
                available: listing.quantity_on_shelf,
            });
        }
        listing.quantity_on_shelf -= quantity;
        let cost = listing.reference_cost;
        if listing.quantity_on_shelf == 0 {
            self.listings.remove(idx);
        }
        Ok(cost)
    }

    /// Index of the first listing for `item_id` with stock left.
    pub fn find_available(&self, item_id: &str) -> Option<usize> {
        self.listings
            .iter()
            .position(|l| l.item_id == item_id && l.quantity_on_shelf > 0)
    }

    pub fn listing(&self, idx: usize) -> Option<&ShelfListing> {
        self.listings.get(idx)
    }

    /// Sell one unit from the listing at `idx`.
    /// Returns the sold listing as it was after the sale, and whether
    /// that emptied it (empty listings are dropped from the table).
    pub(crate) fn sell_one(&mut self, idx: usize) -> Option<(ShelfListing, bool)> {
        let listing = self.listings.get_mut(idx)?;
        if listing.quantity_on_shelf == 0 {
            return None;
        }
        listing.quantity_on_shelf -= 1;
        let snapshot = listing.clone();
        let sold_out = snapshot.quantity_on_shelf == 0;
        if sold_out {
            self.listings.remove(idx);
        }
        Some((snapshot, sold_out))
    }

    pub fn listings(&self) -> &[ShelfListing] {
        &self.listings
    }

    pub fn quantity_of(&self, item_id: &str) -> u32 {
        self.listings
            .iter()
            .filter(|l| l.item_id == item_id)
            .map(|l| l.quantity_on_shelf)
            .sum()
    }

    pub fn total_units(&self) -> u32 {
        self.listings.iter().map(|l| l.quantity_on_shelf).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    fn find_listing_mut(&mut self, item_id: &str, price: f64) -> Option<&mut ShelfListing> {
        self.listings
            .iter_mut()
            .find(|l| l.item_id == item_id && same_price(l.selling_price, price))
    }
}

pub fn validate_price(price: f64) -> SimResult<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidPrice { price })
    }
}

fn same_price(a: f64, b: f64) -> bool {
    (a - b).abs() < PRICE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_price_merges_different_price_splits() {
        let mut shelf = ShelfTable::new();
        shelf.place("Bread", 5, 1.20, 1.00).unwrap();
        shelf.place("Bread", 3, 1.20, 1.00).unwrap();
        shelf.place("Bread", 2, 1.40, 1.00).unwrap();
        assert_eq!(shelf.listings().len(), 2);
        assert_eq!(shelf.listings()[0].quantity_on_shelf, 8);
        assert_eq!(shelf.listings()[0].initial_quantity, 8);
        assert_eq!(shelf.quantity_of("Bread"), 10);
    }

    #[test]
    fn negative_or_nan_price_rejected() {
        let mut shelf = ShelfTable::new();
        assert!(matches!(shelf.place("Milk", 1, -0.5, 0.8), Err(SimError::InvalidPrice { .. })));
        assert!(shelf.place("Milk", 1, f64::NAN, 0.8).is_err());
        assert!(shelf.is_empty());
    }

    #[test]
    fn selling_last_unit_drops_listing() {
        let mut shelf = ShelfTable::new();
        shelf.place("Tea", 1, 2.0, 1.8).unwrap();
        let idx = shelf.find_available("Tea").unwrap();
        let (sold, sold_out) = shelf.sell_one(idx).unwrap();
        assert_eq!(sold.quantity_on_shelf, 0);
        assert!(sold_out);
        assert!(shelf.find_available("Tea").is_none());
    }

    #[test]
    fn remove_partial_then_rest() {
        let mut shelf = ShelfTable::new();
        shelf.place("Rice", 4, 1.5, 1.1).unwrap();
        let cost = shelf.remove("Rice", 1.5, 1).unwrap();
        assert!((cost - 1.1).abs() < 1e-9);
        assert_eq!(shelf.quantity_of("Rice"), 3);
        assert!(matches!(
            shelf.remove("Rice", 1.5, 9),
            Err(SimError::InsufficientStock { available: 3, .. })
        ));
        shelf.remove("Rice", 1.5, 3).unwrap();
        assert!(shelf.is_empty());
        assert!(matches!(shelf.remove("Rice", 1.5, 1), Err(SimError::ListingNotFound { .. })));
    }

    #[test]
    fn demand_band_thresholds() {
        assert_eq!(DemandBand::classify(1.25, 1.0), DemandBand::Healthy);
        assert_eq!(DemandBand::classify(1.40, 1.0), DemandBand::Stretched);
        assert_eq!(DemandBand::classify(1.60, 1.0), DemandBand::Overpriced);
    }
}
