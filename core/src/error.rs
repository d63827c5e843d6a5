use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Missing references ─────────────────────────

    #[error("Item '{item_id}' is not in the wholesale catalog or inventory")]
    UnknownItem { item_id: String },

    #[error("No shelf listing for '{item_id}' at £{price:.2}")]
    ListingNotFound { item_id: String, price: f64 },

    #[error("Customer '{customer_id}' not found")]
    CustomerNotFound { customer_id: String },

    // ── Invalid economic state ─────────────────────

    #[error("Insufficient funds: need £{needed:.2}, have £{available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Insufficient stock of '{item_id}': requested {requested}, available {available}")]
    InsufficientStock { item_id: String, requested: u32, available: u32 },

    #[error("Invalid price {price}: must be a finite value >= 0")]
    InvalidPrice { price: f64 },

    #[error("Invalid quantity: must be greater than zero")]
    InvalidQuantity,

    #[error("Invalid time scale {multiplier}: must be one of 1, 2, 4, 8, 16")]
    InvalidTimeScale { multiplier: u32 },

    // ── Day lifecycle ──────────────────────────────

    #[error("Cannot end the day: {active} customer(s) still in the shop")]
    CustomersStillActive { active: usize },

    #[error("Cannot end the day while the shop is open")]
    DayInProgress,

    #[error("Day {day} has finished trading; it ends once the last customer leaves")]
    DayOver { day: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
