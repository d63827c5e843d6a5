//! Customer generation: who walks in and what they want.
//!
//! Arrival cadence is driven by shop reputation: the gap between arrivals
//! interpolates from the slowest interval at reputation 0 down to the
//! fastest at reputation 100. The generator only counts down while the shop
//! is open and below capacity; outside those bounds nobody is admitted.

use crate::{
    config::{CatalogItem, ShopConfig, ToleranceTier},
    name_generator::NameGenerator,
    rng::SubsystemRng,
    types::{EntityId, ItemId, SimMillis},
};
use serde::{Deserialize, Serialize};

/// One unit a customer has put in their basket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasketLine {
    pub item_id: ItemId,
    pub price: f64,
    pub cost: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: EntityId,
    pub name: String,
    pub budget: f64,
    pub starting_budget: f64,
    /// Desired items in order of desire; never contains duplicates.
    pub desired_items: Vec<ItemId>,
    pub tolerance_multiplier: f64,
    pub basket: Vec<BasketLine>,
    pub feedback: String,
}

impl Customer {
    pub fn has_purchased(&self) -> bool {
        !self.basket.is_empty()
    }

    pub fn basket_total(&self) -> f64 {
        self.basket.iter().map(|l| l.price).sum()
    }

    /// Highest price this customer accepts for an item with this cost.
    pub fn price_ceiling(&self, reference_cost: f64) -> f64 {
        reference_cost * self.tolerance_multiplier
    }
}

pub struct CustomerGenerator {
    budget_min:         f64,
    budget_max:         f64,
    max_desired_items:  usize,
    capacity:           usize,
    slowest_spawn_secs: f64,
    fastest_spawn_secs: f64,
    tolerance_tiers:    Vec<ToleranceTier>,
    spawn_timer_ms:     f64,
    next_id:            u64,
}

impl CustomerGenerator {
    pub fn new(config: &ShopConfig) -> Self {
        Self {
            budget_min:         config.budget_min,
            budget_max:         config.budget_max,
            max_desired_items:  config.max_desired_items,
            capacity:           config.capacity,
            slowest_spawn_secs: config.slowest_spawn_secs,
            fastest_spawn_secs: config.fastest_spawn_secs,
            tolerance_tiers:    config.tolerance_tiers.clone(),
            spawn_timer_ms:     0.0,
            next_id:            0,
        }
    }

    /// Seconds between arrivals at this reputation.
    pub fn spawn_interval_secs(&self, reputation: f64) -> f64 {
        let t = (reputation / 100.0).clamp(0.0, 1.0);
        self.slowest_spawn_secs + (self.fastest_spawn_secs - self.slowest_spawn_secs) * t
    }

    /// Restart the countdown, e.g. when the shop opens.
    pub fn reset_timer(&mut self, reputation: f64) {
        self.spawn_timer_ms = self.spawn_interval_secs(reputation) * 1000.0;
    }

    pub fn spawn_timer_ms(&self) -> f64 {
        self.spawn_timer_ms
    }

    /// Whether a new customer may enter right now.
    pub fn admits(&self, shop_open: bool, active_customers: usize) -> bool {
        shop_open && active_customers < self.capacity
    }

    /// Count down `dt_ms` of simulated time and spawn every arrival that
    /// fell due, up to capacity. Overshoot past an arrival carries into the
    /// next interval, so a long tick spawns what several short ones would.
    pub fn poll(
        &mut self,
        dt_ms:            SimMillis,
        shop_open:        bool,
        active_customers: usize,
        reputation:       f64,
        catalog:          &[CatalogItem],
        rng:              &mut SubsystemRng,
        name_rng:         &mut SubsystemRng,
    ) -> Vec<Customer> {
        let mut spawned = Vec::new();
        if !self.admits(shop_open, active_customers) {
            return spawned;
        }
        self.spawn_timer_ms -= dt_ms as f64;
        while self.spawn_timer_ms <= 0.0 {
            if !self.admits(shop_open, active_customers + spawned.len()) {
                // Full: the next arrival waits for a free place, no backlog.
                self.spawn_timer_ms = 0.0;
                break;
            }
            spawned.push(self.spawn_customer(reputation, catalog, rng, name_rng));
        }
        spawned
    }

    /// Build one shopper with a budget, a desired-item list and a
    /// price tolerance. The next arrival is scheduled from `reputation`,
    /// less any time already overdue.
    pub fn spawn_customer(
        &mut self,
        reputation: f64,
        catalog:    &[CatalogItem],
        rng:        &mut SubsystemRng,
        name_rng:   &mut SubsystemRng,
    ) -> Customer {
        self.next_id += 1;
        let budget = rng.range_f64(self.budget_min, self.budget_max);
        let desired_items = self.sample_desired_items(catalog, rng);
        let tolerance_multiplier = self.sample_tolerance(rng);
        let name = NameGenerator::generate_customer_name(name_rng);
        self.spawn_timer_ms =
            self.spawn_timer_ms.min(0.0) + self.spawn_interval_secs(reputation) * 1000.0;

        log::debug!(
            "customer: spawned {name} budget=£{budget:.2} tolerance={tolerance_multiplier:.3} wants={desired_items:?}"
        );

        Customer {
            id: format!("cust-{:05}", self.next_id),
            name,
            budget,
            starting_budget: budget,
            desired_items,
            tolerance_multiplier,
            basket: Vec::new(),
            feedback: String::new(),
        }
    }

    /// Draw with replacement, keep the first occurrence of each item.
    fn sample_desired_items(&self, catalog: &[CatalogItem], rng: &mut SubsystemRng) -> Vec<ItemId> {
        let draws = self.max_desired_items.min(catalog.len());
        let mut desired: Vec<ItemId> = Vec::with_capacity(draws);
        for _ in 0..draws {
            let pick = &catalog[rng.pick_index(catalog.len())];
            if !desired.contains(&pick.item_id) {
                desired.push(pick.item_id.clone());
            }
        }
        desired
    }

    fn sample_tolerance(&self, rng: &mut SubsystemRng) -> f64 {
        let roll = rng.range_f64(0.0, 100.0);
        let tier = self
            .tolerance_tiers
            .iter()
            .find(|t| roll <= t.upper_roll)
            .or_else(|| self.tolerance_tiers.last());
        match tier {
            Some(t) => rng.range_f64(t.min, t.max),
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, RngSlot};

    fn setup() -> (ShopConfig, CustomerGenerator, SubsystemRng, SubsystemRng) {
        let config = ShopConfig::default_test();
        let generator = CustomerGenerator::new(&config);
        let bank = RngBank::new(0xC0FFEE);
        (config, generator, bank.stream(RngSlot::Customer), bank.stream(RngSlot::Names))
    }

    #[test]
    fn spawn_interval_interpolates_with_reputation() {
        let (_, generator, _, _) = setup();
        assert!((generator.spawn_interval_secs(0.0) - 15.0).abs() < 1e-9);
        assert!((generator.spawn_interval_secs(100.0) - 2.0).abs() < 1e-9);
        assert!((generator.spawn_interval_secs(50.0) - 8.5).abs() < 1e-9);
    }

    #[test]
    fn desired_items_are_unique_and_bounded() {
        let (config, mut generator, mut rng, mut names) = setup();
        for _ in 0..200 {
            let c = generator.spawn_customer(5.0, &config.catalog, &mut rng, &mut names);
            assert!(!c.desired_items.is_empty());
            assert!(c.desired_items.len() <= 10);
            let mut sorted = c.desired_items.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), c.desired_items.len(), "duplicates in {:?}", c.desired_items);
        }
    }

    #[test]
    fn budget_and_tolerance_within_configured_bounds() {
        let (config, mut generator, mut rng, mut names) = setup();
        let mut standard = 0;
        for _ in 0..2_000 {
            let c = generator.spawn_customer(5.0, &config.catalog, &mut rng, &mut names);
            assert!((1.0..50.0).contains(&c.budget));
            assert_eq!(c.budget, c.starting_budget);
            assert!((1.20..2.00).contains(&c.tolerance_multiplier));
            if (1.25..1.35).contains(&c.tolerance_multiplier) {
                standard += 1;
            }
        }
        // The standard tier is drawn ~80% of the time.
        assert!((1_450..1_750).contains(&standard), "standard tier count {standard}");
    }

    #[test]
    fn small_catalog_limits_desired_items() {
        let (mut config, mut generator, mut rng, mut names) = setup();
        config.catalog.truncate(2);
        for _ in 0..50 {
            let c = generator.spawn_customer(5.0, &config.catalog, &mut rng, &mut names);
            assert!(c.desired_items.len() <= 2);
        }
    }

    #[test]
    fn no_spawn_when_closed_or_full() {
        let (config, mut generator, mut rng, mut names) = setup();
        generator.reset_timer(5.0);
        let huge = 10_000_000;
        assert!(generator
            .poll(huge, false, 0, 5.0, &config.catalog, &mut rng, &mut names)
            .is_empty());
        assert!(generator
            .poll(huge, true, 10, 5.0, &config.catalog, &mut rng, &mut names)
            .is_empty());
        let spawned = generator.poll(huge, true, 9, 5.0, &config.catalog, &mut rng, &mut names);
        assert_eq!(spawned.len(), 1, "only one place was free");
        assert_eq!(generator.spawn_timer_ms(), 0.0);
    }

    #[test]
    fn timer_counts_down_before_spawning() {
        let (config, mut generator, mut rng, mut names) = setup();
        generator.reset_timer(100.0); // 2s
        assert!(generator
            .poll(1_500, true, 0, 100.0, &config.catalog, &mut rng, &mut names)
            .is_empty());
        let spawned = generator.poll(500, true, 0, 100.0, &config.catalog, &mut rng, &mut names);
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].id, "cust-00001");
        assert!((generator.spawn_timer_ms() - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn long_tick_spawns_every_arrival_it_covers() {
        let (config, mut generator, mut rng, mut names) = setup();
        generator.reset_timer(100.0); // 2s
        // 7s covers arrivals at 2s, 4s and 6s; 1s remains until the next.
        let spawned = generator.poll(7_000, true, 0, 100.0, &config.catalog, &mut rng, &mut names);
        let ids: Vec<&str> = spawned.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["cust-00001", "cust-00002", "cust-00003"]);
        assert!((generator.spawn_timer_ms() - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn overshoot_carries_into_the_next_interval() {
        let (config, mut generator, mut rng, mut names) = setup();
        generator.reset_timer(100.0); // 2s
        assert_eq!(
            generator.poll(2_500, true, 0, 100.0, &config.catalog, &mut rng, &mut names).len(),
            1
        );
        // 0.5s of the next interval is already spent.
        assert!((generator.spawn_timer_ms() - 1_500.0).abs() < 1e-9);
        assert_eq!(
            generator.poll(1_500, true, 1, 100.0, &config.catalog, &mut rng, &mut names).len(),
            1
        );
    }
}
