//! Purchase resolution: one pass over a customer's desired items against
//! the shelf, in desire order.
//!
//! Each desired item ends in exactly one [`ItemOutcome`]. Accepted items
//! take one unit off the first listing with stock and debit the budget
//! immediately, so later items in the list see the reduced budget.

use crate::{
    customer::{BasketLine, Customer},
    rng::SubsystemRng,
    shelf::{ShelfListing, ShelfTable},
    types::{EntityId, ItemId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Purchased { price: f64, profit: f64 },
    /// Price above the customer's tolerance for this item's cost.
    TooExpensive { price: f64, ceiling: f64 },
    /// Price was acceptable but the remaining budget was not.
    OverBudget { price: f64, budget: f64 },
    NotFound,
}

impl ItemOutcome {
    /// Over-budget rejections read as "too expensive" to the customer.
    pub fn is_too_expensive(&self) -> bool {
        matches!(self, Self::TooExpensive { .. } | Self::OverBudget { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemResolution {
    pub item_id: ItemId,
    pub outcome: ItemOutcome,
}

/// A completed checkout. Built once from a customer's basket, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub customer_id:   EntityId,
    pub customer_name: String,
    /// Units bought per item.
    pub items:         BTreeMap<ItemId, u32>,
    pub lines:         Vec<BasketLine>,
    pub total_revenue: f64,
    pub total_cost:    f64,
    pub total_profit:  f64,
}

impl Transaction {
    /// None when the basket is empty.
    pub fn from_customer(customer: &Customer) -> Option<Self> {
        if customer.basket.is_empty() {
            return None;
        }
        let mut items = BTreeMap::new();
        for line in &customer.basket {
            *items.entry(line.item_id.clone()).or_insert(0) += 1;
        }
        Some(Self {
            customer_id:   customer.id.clone(),
            customer_name: customer.name.clone(),
            items,
            lines:         customer.basket.clone(),
            total_revenue: customer.basket.iter().map(|l| l.price).sum(),
            total_cost:    customer.basket.iter().map(|l| l.cost).sum(),
            total_profit:  customer.basket.iter().map(|l| l.profit).sum(),
        })
    }

    pub fn unit_count(&self) -> u32 {
        self.items.values().sum()
    }

    /// Plain-text till receipt.
    pub fn receipt(&self) -> String {
        let mut out = format!("Receipt for {}\n", self.customer_name);
        for line in &self.lines {
            out.push_str(&format!("  {:<16} £{:>6.2}\n", line.item_id, line.price));
        }
        out.push_str(&format!("  {:<16} £{:>6.2}\n", "TOTAL", self.total_revenue));
        out
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub resolutions: Vec<ItemResolution>,
    /// Listings emptied during this pass (already dropped from the shelf).
    pub sold_out:    Vec<ShelfListing>,
    pub feedback:    String,
}

impl PurchaseOutcome {
    pub fn purchased_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Purchased { .. }))
    }

    pub fn too_expensive_count(&self) -> usize {
        self.count(ItemOutcome::is_too_expensive)
    }

    pub fn not_found_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::NotFound))
    }

    /// Desired items the customer leaves without, for any reason.
    pub fn unmet_count(&self) -> usize {
        self.resolutions.len() - self.purchased_count()
    }

    pub fn all_found(&self) -> bool {
        !self.resolutions.is_empty() && self.unmet_count() == 0
    }

    pub fn spent(&self) -> f64 {
        self.resolutions
            .iter()
            .filter_map(|r| match r.outcome {
                ItemOutcome::Purchased { price, .. } => Some(price),
                _ => None,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.resolutions.iter().filter(|r| pred(&r.outcome)).count()
    }
}

pub struct PurchaseResolver;

impl PurchaseResolver {
    /// Walk the customer's desired items against the shelf, filling the
    /// basket and writing feedback onto the customer.
    pub fn resolve(
        customer: &mut Customer,
        shelf:    &mut ShelfTable,
        rng:      &mut SubsystemRng,
    ) -> PurchaseOutcome {
        let mut outcome = PurchaseOutcome::default();

        for item_id in customer.desired_items.clone() {
            let resolved = Self::resolve_item(customer, shelf, &item_id, &mut outcome.sold_out);
            outcome.resolutions.push(ItemResolution { item_id, outcome: resolved });
        }

        outcome.feedback = compose_feedback(&outcome.resolutions, rng);
        customer.feedback = outcome.feedback.clone();

        log::debug!(
            "purchase: {} bought={} too_expensive={} not_found={} spent=£{:.2}",
            customer.name,
            outcome.purchased_count(),
            outcome.too_expensive_count(),
            outcome.not_found_count(),
            outcome.spent(),
        );
        outcome
    }

    fn resolve_item(
        customer: &mut Customer,
        shelf:    &mut ShelfTable,
        item_id:  &str,
        sold_out: &mut Vec<ShelfListing>,
    ) -> ItemOutcome {
        let Some(idx) = shelf.find_available(item_id) else {
            return ItemOutcome::NotFound;
        };
        let Some(listing) = shelf.listing(idx) else {
            return ItemOutcome::NotFound;
        };

        let price = listing.selling_price;
        let ceiling = customer.price_ceiling(listing.reference_cost);
        if price > ceiling {
            return ItemOutcome::TooExpensive { price, ceiling };
        }
        if customer.budget < price {
            return ItemOutcome::OverBudget { price, budget: customer.budget };
        }

        let Some((after, emptied)) = shelf.sell_one(idx) else {
            return ItemOutcome::NotFound;
        };
        let profit = price - after.reference_cost;
        customer.budget -= price;
        customer.basket.push(BasketLine {
            item_id: item_id.to_string(),
            price,
            cost: after.reference_cost,
            profit,
        });
        if emptied {
            sold_out.push(after);
        }
        ItemOutcome::Purchased { price, profit }
    }
}

/// One positive line for a random purchase, one negative line for the
/// first too-expensive item, falling back to a random missing item.
fn compose_feedback(resolutions: &[ItemResolution], rng: &mut SubsystemRng) -> String {
    let purchased: Vec<&ItemResolution> = resolutions
        .iter()
        .filter(|r| matches!(r.outcome, ItemOutcome::Purchased { .. }))
        .collect();
    let not_found: Vec<&ItemResolution> = resolutions
        .iter()
        .filter(|r| r.outcome == ItemOutcome::NotFound)
        .collect();

    let positive = (!purchased.is_empty())
        .then(|| format!("Got {}", purchased[rng.pick_index(purchased.len())].item_id));

    let negative = match resolutions.iter().find(|r| r.outcome.is_too_expensive()) {
        Some(r) => Some(format!("{} was too expensive", r.item_id)),
        None if !not_found.is_empty() => Some(format!(
            "Couldn't find any {}",
            not_found[rng.pick_index(not_found.len())].item_id
        )),
        None => None,
    };

    [positive, negative].into_iter().flatten().collect::<Vec<_>>().join(" ")
}
