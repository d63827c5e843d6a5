//! Shared primitive types used across the entire simulation.

/// One engine step. The amount of simulated time a tick covers
/// depends on the real delta passed in and the current time scale.
pub type Tick = u64;

/// Simulated time in milliseconds since the run started.
pub type SimMillis = u64;

/// A stable, unique identifier for any entity in the simulation.
pub type EntityId = String;

/// Wholesale catalog item name. Items are matched by exact name.
pub type ItemId = String;

/// The canonical run identifier.
pub type RunId = String;

/// In-game day number, starting at 1.
pub type DayNumber = u32;
