//! Everything the shop reports outward.
//!
//! Each tick returns the events it produced, in the order they happened,
//! and the engine appends the same events to the run record.

use crate::{
    purchase::Transaction,
    shelf::DemandBand,
    stats::DailyStats,
    types::{DayNumber, EntityId, ItemId, RunId, Tick},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Run and day lifecycle ──────────────────────
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    ShopOpened {
        tick: Tick,
        day: DayNumber,
    },
    ShopClosed {
        tick: Tick,
        day: DayNumber,
    },
    DayStarted {
        tick: Tick,
        day: DayNumber,
    },
    DayEnded {
        tick: Tick,
        stats: DailyStats,
    },

    // ── Clock controls ─────────────────────────────
    TimeScaleChanged {
        tick: Tick,
        multiplier: u32,
    },
    PauseToggled {
        tick: Tick,
        paused: bool,
    },

    // ── Customers ──────────────────────────────────
    CustomerArrived {
        tick: Tick,
        customer_id: EntityId,
        name: String,
        budget: f64,
        desired_items: Vec<ItemId>,
    },
    CustomerFeedback {
        tick: Tick,
        customer_id: EntityId,
        text: String,
    },
    CustomerQueued {
        tick: Tick,
        customer_id: EntityId,
        position: usize,
    },
    CustomerLeft {
        tick: Tick,
        customer_id: EntityId,
        purchased: bool,
    },
    TransactionCompleted {
        tick: Tick,
        transaction: Transaction,
        receipt: String,
    },
    StockShortage {
        tick: Tick,
        customer_id: EntityId,
        count: u32,
    },
    SatisfactionChanged {
        tick: Tick,
        value: f64,
        delta: f64,
    },
    ReputationChanged {
        tick: Tick,
        value: f64,
        delta: f64,
    },

    // ── Stock management ───────────────────────────
    WholesalePurchased {
        tick: Tick,
        item_id: ItemId,
        quantity: u32,
        unit_cost: f64,
        total: f64,
    },
    ShelfStocked {
        tick: Tick,
        item_id: ItemId,
        quantity: u32,
        price: f64,
        band: DemandBand,
    },
    ShelfItemRemoved {
        tick: Tick,
        item_id: ItemId,
        quantity: u32,
        price: f64,
    },
    ItemSoldOut {
        tick: Tick,
        item_id: ItemId,
        price: f64,
    },

    // ── Commands ───────────────────────────────────
    CommandRejected {
        tick: Tick,
        command_id: EntityId,
        reason: String,
    },
}

impl SimEvent {
    /// Snake-case variant name, as written to the `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } => "run_initialized",
            Self::ShopOpened { .. } => "shop_opened",
            Self::ShopClosed { .. } => "shop_closed",
            Self::DayStarted { .. } => "day_started",
            Self::DayEnded { .. } => "day_ended",
            Self::TimeScaleChanged { .. } => "time_scale_changed",
            Self::PauseToggled { .. } => "pause_toggled",
            Self::CustomerArrived { .. } => "customer_arrived",
            Self::CustomerFeedback { .. } => "customer_feedback",
            Self::CustomerQueued { .. } => "customer_queued",
            Self::CustomerLeft { .. } => "customer_left",
            Self::TransactionCompleted { .. } => "transaction_completed",
            Self::StockShortage { .. } => "stock_shortage",
            Self::SatisfactionChanged { .. } => "satisfaction_changed",
            Self::ReputationChanged { .. } => "reputation_changed",
            Self::WholesalePurchased { .. } => "wholesale_purchased",
            Self::ShelfStocked { .. } => "shelf_stocked",
            Self::ShelfItemRemoved { .. } => "shelf_item_removed",
            Self::ItemSoldOut { .. } => "item_sold_out",
            Self::CommandRejected { .. } => "command_rejected",
        }
    }

    /// Component that raised the event; stored alongside it.
    pub fn source(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }
            | Self::ShopOpened { .. }
            | Self::ShopClosed { .. }
            | Self::DayStarted { .. }
            | Self::CommandRejected { .. } => "engine",
            Self::TimeScaleChanged { .. } | Self::PauseToggled { .. } => "clock",
            Self::DayEnded { .. } => "stats",
            Self::CustomerArrived { .. }
            | Self::CustomerFeedback { .. }
            | Self::CustomerLeft { .. }
            | Self::StockShortage { .. } => "customer",
            Self::CustomerQueued { .. } | Self::TransactionCompleted { .. } => "till",
            Self::SatisfactionChanged { .. } | Self::ReputationChanged { .. } => "reputation",
            Self::WholesalePurchased { .. } => "inventory",
            Self::ShelfStocked { .. } | Self::ShelfItemRemoved { .. } | Self::ItemSoldOut { .. } => {
                "shelf"
            }
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub tick: Tick,
    pub source: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_matches_event_type() {
        let events = vec![
            SimEvent::ShopOpened { tick: 1, day: 1 },
            SimEvent::StockShortage { tick: 2, customer_id: "c".into(), count: 3 },
            SimEvent::CommandRejected { tick: 3, command_id: "x".into(), reason: "no".into() },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.event_type());
            let back: SimEvent = serde_json::from_value(value).unwrap();
            assert_eq!(back, event);
        }
    }
}
