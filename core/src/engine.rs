//! The shop engine: owns every component and drives them each tick.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Apply queued player commands
//!   2. Advance the clock
//!   3. Fire scheduled customer tasks that are due
//!   4. Admit the next queued customer to a free till
//!   5. Spawn the customers whose arrival fell due (open, below capacity)
//!   6. Day-length check, then end of day once the shop is empty
//!
//! RULES:
//!   - The engine is the only writer of shop state.
//!   - All randomness flows through the RngBank streams held here.
//!   - Every event is appended to the run record as it is raised.

use crate::{
    cash::CashAccount,
    clock::SimClock,
    command::{PlayerCommand, QueuedCommand},
    config::ShopConfig,
    customer::{Customer, CustomerGenerator},
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    inventory::InventoryLedger,
    purchase::{PurchaseResolver, Transaction},
    reputation::{ReputationTracker, SatisfactionTracker},
    rng::{RngBank, RngSlot, SubsystemRng},
    scheduler::{Scheduler, Task},
    shelf::{validate_price, DemandBand, ShelfTable},
    stats::{DailyAggregator, DailyStats, OverallStats},
    store::SimStore,
    till::Till,
    types::{EntityId, RunId, Tick},
};
use std::collections::BTreeMap;

pub struct ShopEngine {
    pub run_id:       RunId,
    pub clock:        SimClock,
    pub rng_bank:     RngBank,
    config:           ShopConfig,
    store:            SimStore,
    customer_rng:     SubsystemRng,
    name_rng:         SubsystemRng,
    feedback_rng:     SubsystemRng,
    cash:             CashAccount,
    inventory:        InventoryLedger,
    shelf:            ShelfTable,
    generator:        CustomerGenerator,
    customers:        BTreeMap<EntityId, Customer>,
    till:             Till,
    scheduler:        Scheduler,
    satisfaction:     SatisfactionTracker,
    reputation:       ReputationTracker,
    stats:            DailyAggregator,
    shop_open:        bool,
    /// The current day has started trading.
    day_running:      bool,
    /// Trading hours are over; waiting for the shop to empty.
    trading_over:     bool,
    pending_commands: Vec<QueuedCommand>,
    next_command_seq: u64,
    outbox:           Vec<SimEvent>,
}

impl ShopEngine {
    /// Wire up a fresh shop. The store must already be migrated and hold
    /// a run row for `run_id`.
    pub fn build(run_id: RunId, seed: u64, config: ShopConfig, store: SimStore) -> SimResult<Self> {
        let rng_bank = RngBank::new(seed);
        let satisfaction = SatisfactionTracker::new(config.satisfaction.clone());
        let reputation = ReputationTracker::new(config.reputation.clone());
        let stats = DailyAggregator::new(satisfaction.value(), reputation.value());

        let mut engine = Self {
            clock:            SimClock::new(),
            customer_rng:     rng_bank.stream(RngSlot::Customer),
            name_rng:         rng_bank.stream(RngSlot::Names),
            feedback_rng:     rng_bank.stream(RngSlot::Feedback),
            rng_bank,
            cash:             CashAccount::new(config.starting_cash),
            inventory:        InventoryLedger::new(),
            shelf:            ShelfTable::new(),
            generator:        CustomerGenerator::new(&config),
            customers:        BTreeMap::new(),
            till:             Till::new(),
            scheduler:        Scheduler::new(),
            satisfaction,
            reputation,
            stats,
            shop_open:        false,
            day_running:      false,
            trading_over:     false,
            pending_commands: Vec::new(),
            next_command_seq: 0,
            outbox:           Vec::new(),
            config,
            store,
            run_id,
        };
        let init = SimEvent::RunInitialized { run_id: engine.run_id.clone(), seed };
        engine.emit(init)?;
        log::info!("run {} initialised with seed {seed}", engine.run_id);
        Ok(engine)
    }

    /// In-memory store and the built-in test config.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        Self::build_test_with(run_id, seed, ShopConfig::default_test())
    }

    pub fn build_test_with(run_id: RunId, seed: u64, config: ShopConfig) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, "test")?;
        Self::build(run_id, seed, config, store)
    }

    // ── Player commands ────────────────────────────────────────

    /// Queue a command for the start of the next tick.
    /// Returns the command id used in any rejection event. Ids are
    /// sequential so replays of the same command stream log identically.
    pub fn submit_command(&mut self, command: PlayerCommand) -> String {
        self.next_command_seq += 1;
        let command_id = format!("cmd-{:06}", self.next_command_seq);
        self.pending_commands.push(QueuedCommand {
            run_id:     self.run_id.clone(),
            queued_at:  self.clock.current_tick,
            command_id: command_id.clone(),
            command,
        });
        command_id
    }

    /// Run a command immediately.
    pub fn apply_command(&mut self, command: &PlayerCommand) -> SimResult<()> {
        match command {
            PlayerCommand::OpenShop => self.open_shop(),
            PlayerCommand::CloseShop => self.close_shop(),
            PlayerCommand::SetTimeScale { multiplier } => self.set_time_scale(*multiplier),
            PlayerCommand::TogglePause => self.toggle_pause().map(|_| ()),
            PlayerCommand::SpeedUp => self.speed_up().map(|_| ()),
            PlayerCommand::SlowDown => self.slow_down().map(|_| ()),
            PlayerCommand::NormalSpeed => self.set_time_scale(1),
            PlayerCommand::BuyWholesale { item_id, quantity } => {
                self.buy_wholesale(item_id, *quantity)
            }
            PlayerCommand::PlaceOnShelf { item_id, quantity, price } => {
                self.place_on_shelf(item_id, *quantity, *price)
            }
            PlayerCommand::RemoveFromShelf { item_id, price, quantity } => {
                self.remove_from_shelf(item_id, *price, *quantity)
            }
        }
    }

    // ── Tick ───────────────────────────────────────────────────

    /// Advance one tick by `real_dt_ms` of wall-clock time. Returns every
    /// event raised since the previous tick, including those from direct
    /// operations called in between.
    pub fn tick(&mut self, real_dt_ms: u64) -> SimResult<Vec<SimEvent>> {
        // 1. Commands
        for queued in std::mem::take(&mut self.pending_commands) {
            if let Err(e) = self.apply_command(&queued.command) {
                if matches!(e, SimError::Database(_) | SimError::Serialization(_)) {
                    return Err(e);
                }
                log::warn!(
                    "tick={} rejected {} ({}): {e}",
                    self.clock.current_tick,
                    queued.command.name(),
                    queued.command_id,
                );
                self.emit(SimEvent::CommandRejected {
                    tick:       self.clock.current_tick,
                    command_id: queued.command_id,
                    reason:     e.to_string(),
                })?;
            }
        }

        // 2. Clock
        let sim_dt = self.clock.advance(real_dt_ms);
        let tick = self.clock.current_tick;

        // 3. Due tasks
        for task in self.scheduler.pop_due(self.clock.now_ms) {
            self.run_task(task)?;
        }

        // 4. Till
        if let Some(customer_id) = self.till.admit_next() {
            log::debug!("tick={tick} till: serving {customer_id}");
            let due = self.clock.after(self.config.till_service_ms);
            self.scheduler.schedule(due, Task::FinishCheckout { customer_id });
        }

        // 5. Arrivals
        self.spawn_customers(sim_dt)?;

        // 6. Day end
        self.check_day_end()?;

        Ok(std::mem::take(&mut self.outbox))
    }

    /// Run `n` ticks of `real_dt_ms` each, discarding the returned events.
    pub fn run_ticks(&mut self, n: u64, real_dt_ms: u64) -> SimResult<()> {
        for _ in 0..n {
            self.tick(real_dt_ms)?;
        }
        Ok(())
    }

    /// Events raised by direct operations that no tick has returned yet.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ── Trading hours ──────────────────────────────────────────

    pub fn open_shop(&mut self) -> SimResult<()> {
        if self.trading_over {
            return Err(SimError::DayOver { day: self.stats.current_day() });
        }
        if self.shop_open {
            return Ok(());
        }
        let tick = self.clock.current_tick;
        let day = self.stats.current_day();
        if !self.day_running {
            self.day_running = true;
            self.clock.open_day();
            self.emit(SimEvent::DayStarted { tick, day })?;
        }
        self.shop_open = true;
        self.generator.reset_timer(self.reputation.value());
        log::info!("day {day}: shop opened at {}", self.shop_time());
        self.emit(SimEvent::ShopOpened { tick, day })
    }

    /// Stop admitting customers. Those inside finish normally.
    pub fn close_shop(&mut self) -> SimResult<()> {
        if !self.shop_open {
            return Ok(());
        }
        self.shop_open = false;
        let day = self.stats.current_day();
        log::info!("day {day}: shop closed with {} customer(s) inside", self.customers.len());
        self.emit(SimEvent::ShopClosed { tick: self.clock.current_tick, day })
    }

    /// Freeze today's stats and start the next day. The shop must be closed
    /// and empty.
    pub fn end_of_day(&mut self) -> SimResult<DailyStats> {
        if self.shop_open {
            return Err(SimError::DayInProgress);
        }
        let active = self.customers.len();
        self.stats.set_satisfaction(self.satisfaction.value());
        self.stats.set_reputation(self.reputation.value());
        let frozen = self.stats.end_of_day(active)?;
        self.store.insert_daily_stats(&self.run_id, &frozen)?;
        // Stock left on the shelf is on sale again tomorrow.
        for listing in self.shelf.listings() {
            self.stats.register_shelved(&listing.item_id, listing.quantity_on_shelf);
        }

        self.day_running = false;
        self.trading_over = false;
        self.clock.reset_controls();

        log::info!(
            "day {} ended: customers={} revenue=£{:.2} profit=£{:.2} satisfaction={:.1} reputation={:.2}",
            frozen.day_number,
            frozen.customer_count,
            frozen.revenue,
            frozen.profit,
            frozen.satisfaction,
            frozen.reputation,
        );
        self.emit(SimEvent::DayEnded { tick: self.clock.current_tick, stats: frozen.clone() })?;
        Ok(frozen)
    }

    // ── Clock controls ─────────────────────────────────────────

    pub fn set_time_scale(&mut self, multiplier: u32) -> SimResult<()> {
        self.clock.set_time_scale(multiplier)?;
        self.emit(SimEvent::TimeScaleChanged { tick: self.clock.current_tick, multiplier })
    }

    pub fn speed_up(&mut self) -> SimResult<u32> {
        let multiplier = self.clock.speed_up();
        self.emit(SimEvent::TimeScaleChanged { tick: self.clock.current_tick, multiplier })?;
        Ok(multiplier)
    }

    pub fn slow_down(&mut self) -> SimResult<u32> {
        let multiplier = self.clock.slow_down();
        self.emit(SimEvent::TimeScaleChanged { tick: self.clock.current_tick, multiplier })?;
        Ok(multiplier)
    }

    pub fn toggle_pause(&mut self) -> SimResult<bool> {
        let paused = self.clock.toggle_pause();
        self.emit(SimEvent::PauseToggled { tick: self.clock.current_tick, paused })?;
        Ok(paused)
    }

    // ── Stock ──────────────────────────────────────────────────

    /// Buy from the wholesale catalog into inventory. Paid in full up front.
    pub fn buy_wholesale(&mut self, item_id: &str, quantity: u32) -> SimResult<()> {
        if quantity == 0 {
            return Err(SimError::InvalidQuantity);
        }
        let unit_cost = self
            .config
            .catalog_item(item_id)
            .map(|c| c.unit_cost)
            .ok_or_else(|| SimError::UnknownItem { item_id: item_id.to_string() })?;
        let total = unit_cost * quantity as f64;

        self.cash.spend(total)?;
        self.inventory.add_stock(item_id, unit_cost, quantity)?;
        self.stats.register_expense(total);

        log::debug!("wholesale: {quantity} x {item_id} for £{total:.2}");
        self.emit(SimEvent::WholesalePurchased {
            tick: self.clock.current_tick,
            item_id: item_id.to_string(),
            quantity,
            unit_cost,
            total,
        })
    }

    /// Move units from inventory onto the shelf at `price`.
    pub fn place_on_shelf(&mut self, item_id: &str, quantity: u32, price: f64) -> SimResult<()> {
        validate_price(price)?;
        if quantity == 0 {
            return Err(SimError::InvalidQuantity);
        }
        let cost = self.inventory.take(item_id, quantity)?;
        self.shelf.place(item_id, quantity, price, cost)?;
        self.stats.register_shelved(item_id, quantity);
        let band = DemandBand::classify(price, cost);

        log::debug!("shelf: {quantity} x {item_id} at £{price:.2} (cost £{cost:.2}, {band:?})");
        self.emit(SimEvent::ShelfStocked {
            tick: self.clock.current_tick,
            item_id: item_id.to_string(),
            quantity,
            price,
            band,
        })
    }

    /// Take units back off a listing and return them to inventory.
    pub fn remove_from_shelf(&mut self, item_id: &str, price: f64, quantity: u32) -> SimResult<()> {
        let cost = self.shelf.remove(item_id, price, quantity)?;
        self.inventory.add_stock(item_id, cost, quantity)?;
        self.emit(SimEvent::ShelfItemRemoved {
            tick: self.clock.current_tick,
            item_id: item_id.to_string(),
            quantity,
            price,
        })
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn cash(&self) -> f64 {
        self.cash.balance()
    }

    pub fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    pub fn shelf(&self) -> &ShelfTable {
        &self.shelf
    }

    pub fn till(&self) -> &Till {
        &self.till
    }

    pub fn is_open(&self) -> bool {
        self.shop_open
    }

    pub fn is_trading_over(&self) -> bool {
        self.trading_over
    }

    pub fn active_customers(&self) -> usize {
        self.customers.len()
    }

    pub fn customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customers.get(customer_id)
    }

    pub fn customers(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    pub fn satisfaction(&self) -> f64 {
        self.satisfaction.value()
    }

    pub fn reputation(&self) -> f64 {
        self.reputation.value()
    }

    /// Seconds until the next arrival at the current reputation.
    pub fn spawn_interval_secs(&self) -> f64 {
        self.generator.spawn_interval_secs(self.reputation.value())
    }

    /// Stats for the day in progress.
    pub fn today(&self) -> &DailyStats {
        self.stats.current()
    }

    pub fn history(&self) -> &[DailyStats] {
        self.stats.history()
    }

    pub fn overall(&self) -> OverallStats {
        self.stats.overall()
    }

    /// Wall-clock style time within shop hours.
    pub fn shop_time(&self) -> chrono::NaiveTime {
        self.clock.shop_time(
            self.config.day_duration_ms,
            self.config.opening_hour,
            self.config.closing_hour,
        )
    }

    /// Query events for a specific tick from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(&self, run_id: &str, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(run_id, tick)
    }

    pub fn store_events_for_run(&self) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_run(&self.run_id)
    }

    pub fn store_event_count(&self, event_type: &str) -> SimResult<i64> {
        self.store.event_count(&self.run_id, event_type)
    }

    pub fn store_daily_stats(&self) -> SimResult<Vec<DailyStats>> {
        self.store.daily_stats_for_run(&self.run_id)
    }

    // ── Internals ──────────────────────────────────────────────

    fn spawn_customers(&mut self, sim_dt: u64) -> SimResult<()> {
        let spawned = self.generator.poll(
            sim_dt,
            self.shop_open,
            self.customers.len(),
            self.reputation.value(),
            &self.config.catalog,
            &mut self.customer_rng,
            &mut self.name_rng,
        );
        let tick = self.clock.current_tick;
        for customer in spawned {
            self.stats.register_customer_entry();
            let due = self.clock.after(self.config.shopping_delay_ms);
            self.scheduler.schedule(due, Task::FinishShopping { customer_id: customer.id.clone() });
            log::debug!("tick={tick} {} entered ({} inside)", customer.name, self.customers.len() + 1);

            self.emit(SimEvent::CustomerArrived {
                tick,
                customer_id:   customer.id.clone(),
                name:          customer.name.clone(),
                budget:        customer.budget,
                desired_items: customer.desired_items.clone(),
            })?;
            self.customers.insert(customer.id.clone(), customer);
        }
        Ok(())
    }

    fn run_task(&mut self, task: Task) -> SimResult<()> {
        match task {
            Task::FinishShopping { customer_id } => self.finish_shopping(customer_id),
            Task::IdleCheck { customer_id } => {
                self.take_customer(&customer_id)?;
                log::debug!("tick={} {customer_id} left without buying", self.clock.current_tick);
                self.emit(SimEvent::CustomerLeft {
                    tick: self.clock.current_tick,
                    customer_id,
                    purchased: false,
                })
            }
            Task::FinishCheckout { customer_id } => self.finish_checkout(customer_id),
        }
    }

    fn finish_shopping(&mut self, customer_id: EntityId) -> SimResult<()> {
        let tick = self.clock.current_tick;
        let customer = self
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| SimError::CustomerNotFound { customer_id: customer_id.clone() })?;
        let outcome = PurchaseResolver::resolve(customer, &mut self.shelf, &mut self.feedback_rng);
        let has_basket = customer.has_purchased();

        for listing in &outcome.sold_out {
            self.emit(SimEvent::ItemSoldOut {
                tick,
                item_id: listing.item_id.clone(),
                price:   listing.selling_price,
            })?;
        }
        if !outcome.feedback.is_empty() {
            self.emit(SimEvent::CustomerFeedback {
                tick,
                customer_id: customer_id.clone(),
                text:        outcome.feedback.clone(),
            })?;
        }

        let unmet = outcome.unmet_count() as u32;
        if unmet > 0 {
            self.stats.register_shortage(unmet);
            self.emit(SimEvent::StockShortage { tick, customer_id: customer_id.clone(), count: unmet })?;
        }

        let sat_delta = self.satisfaction.apply_outcome(
            outcome.too_expensive_count(),
            outcome.not_found_count(),
            outcome.purchased_count(),
        );
        self.stats.set_satisfaction(self.satisfaction.value());
        if sat_delta != 0.0 {
            self.emit(SimEvent::SatisfactionChanged {
                tick,
                value: self.satisfaction.value(),
                delta: sat_delta,
            })?;
        }

        let rep_delta = self.reputation.apply_outcome(
            outcome.purchased_count(),
            outcome.unmet_count(),
            outcome.all_found(),
        );
        self.stats.set_reputation(self.reputation.value());
        if rep_delta != 0.0 {
            self.emit(SimEvent::ReputationChanged {
                tick,
                value: self.reputation.value(),
                delta: rep_delta,
            })?;
        }

        if has_basket {
            let position = self.till.enqueue(customer_id.clone());
            self.emit(SimEvent::CustomerQueued { tick, customer_id, position })
        } else {
            let due = self.clock.after(self.config.idle_timeout_ms);
            self.scheduler.schedule(due, Task::IdleCheck { customer_id });
            Ok(())
        }
    }

    fn finish_checkout(&mut self, customer_id: EntityId) -> SimResult<()> {
        let tick = self.clock.current_tick;
        self.till.finish(&customer_id)?;
        let customer = self.take_customer(&customer_id)?;

        if let Some(tx) = Transaction::from_customer(&customer) {
            self.cash.deposit(tx.total_revenue);
            self.stats.register_transaction(&tx);
            let receipt = tx.receipt();
            log::debug!(
                "tick={tick} till: {} paid £{:.2} (profit £{:.2})\n{receipt}",
                tx.customer_name,
                tx.total_revenue,
                tx.total_profit,
            );
            self.emit(SimEvent::TransactionCompleted { tick, transaction: tx, receipt })?;
        }
        self.emit(SimEvent::CustomerLeft { tick, customer_id, purchased: true })
    }

    fn check_day_end(&mut self) -> SimResult<()> {
        if self.day_running
            && !self.trading_over
            && self.clock.day_elapsed_ms() >= self.config.day_duration_ms
        {
            self.trading_over = true;
            self.close_shop()?;
        }
        if self.trading_over && self.customers.is_empty() {
            self.end_of_day()?;
        }
        Ok(())
    }

    fn take_customer(&mut self, customer_id: &str) -> SimResult<Customer> {
        self.customers
            .remove(customer_id)
            .ok_or_else(|| SimError::CustomerNotFound { customer_id: customer_id.to_string() })
    }

    fn emit(&mut self, event: SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            tick:       self.clock.current_tick,
            source:     event.source().to_string(),
            event_type: event.event_type().to_string(),
            payload:    serde_json::to_string(&event)?,
        };
        self.store.append_event(&entry)?;
        self.outbox.push(event);
        Ok(())
    }
}
