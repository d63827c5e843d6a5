//! Simulation clock. Owns simulated time, time scale, and pause.

use crate::{
    error::{SimError, SimResult},
    types::{SimMillis, Tick},
};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

/// Allowed time-scale multipliers, slowest first.
pub const TIME_SCALES: [u32; 5] = [1, 2, 4, 8, 16];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub current_tick: Tick,
    /// Absolute simulated time since the run started.
    pub now_ms:       SimMillis,
    /// Absolute simulated time at which the current trading day opened.
    pub day_opened_at: SimMillis,
    pub time_scale:   u32,
    pub paused:       bool,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            current_tick:  0,
            now_ms:        0,
            day_opened_at: 0,
            time_scale:    1,
            paused:        false,
        }
    }

    /// Advance one tick by `real_dt_ms` of wall-clock time.
    /// Returns the simulated milliseconds that elapsed (zero while paused).
    pub fn advance(&mut self, real_dt_ms: u64) -> SimMillis {
        self.current_tick += 1;
        let sim_dt = real_dt_ms.saturating_mul(self.effective_multiplier() as u64);
        self.now_ms = self.now_ms.saturating_add(sim_dt);
        sim_dt
    }

    /// Multiplier actually applied to real time: zero while paused.
    pub fn effective_multiplier(&self) -> u32 {
        if self.paused { 0 } else { self.time_scale }
    }

    pub fn set_time_scale(&mut self, multiplier: u32) -> SimResult<()> {
        if !TIME_SCALES.contains(&multiplier) {
            return Err(SimError::InvalidTimeScale { multiplier });
        }
        self.time_scale = multiplier;
        Ok(())
    }

    /// Double the time scale, capped at 16x. Returns the new scale.
    pub fn speed_up(&mut self) -> u32 {
        if self.time_scale < 16 {
            self.time_scale *= 2;
        }
        self.time_scale
    }

    /// Halve the time scale, floored at 1x. Returns the new scale.
    pub fn slow_down(&mut self) -> u32 {
        if self.time_scale > 1 {
            self.time_scale /= 2;
        }
        self.time_scale
    }

    /// Flip the pause flag. Returns true if the clock is now paused.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Mark the start of a new trading day at the current instant.
    pub fn open_day(&mut self) {
        self.day_opened_at = self.now_ms;
    }

    /// Back to normal speed, unpaused. Applied when a day closes.
    pub fn reset_controls(&mut self) {
        self.time_scale = 1;
        self.paused = false;
    }

    /// Simulated instant `delay_ms` from now.
    pub fn after(&self, delay_ms: SimMillis) -> SimMillis {
        self.now_ms.saturating_add(delay_ms)
    }

    pub fn day_elapsed_ms(&self) -> SimMillis {
        self.now_ms.saturating_sub(self.day_opened_at)
    }

    /// Map day progress onto shop hours, e.g. 09:00 through 17:00.
    pub fn shop_time(
        &self,
        day_duration_ms: SimMillis,
        opening_hour:    u32,
        closing_hour:    u32,
    ) -> NaiveTime {
        let progress = if day_duration_ms == 0 {
            1.0
        } else {
            (self.day_elapsed_ms() as f64 / day_duration_ms as f64).min(1.0)
        };
        let open = NaiveTime::from_hms_opt(opening_hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
        let span_secs = closing_hour.saturating_sub(opening_hour) as f64 * 3600.0;
        open + Duration::seconds((progress * span_secs) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_scales_real_time() {
        let mut clock = SimClock::new();
        clock.set_time_scale(4).unwrap();
        assert_eq!(clock.advance(100), 400);
        assert_eq!(clock.now_ms, 400);
        assert_eq!(clock.current_tick, 1);
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut clock = SimClock::new();
        assert!(clock.toggle_pause());
        assert_eq!(clock.advance(1_000), 0);
        assert_eq!(clock.now_ms, 0);
        assert!(!clock.toggle_pause());
        assert_eq!(clock.advance(1_000), 1_000);
    }

    #[test]
    fn rejects_unsupported_scale() {
        let mut clock = SimClock::new();
        assert!(matches!(
            clock.set_time_scale(3),
            Err(SimError::InvalidTimeScale { multiplier: 3 })
        ));
        assert_eq!(clock.time_scale, 1);
    }

    #[test]
    fn speed_controls_are_capped() {
        let mut clock = SimClock::new();
        for _ in 0..10 {
            clock.speed_up();
        }
        assert_eq!(clock.time_scale, 16);
        for _ in 0..10 {
            clock.slow_down();
        }
        assert_eq!(clock.time_scale, 1);
    }

    #[test]
    fn oversized_tick_saturates_instead_of_overflowing() {
        let mut clock = SimClock::new();
        clock.set_time_scale(16).unwrap();
        assert_eq!(clock.advance(u64::MAX / 8), u64::MAX);
        assert_eq!(clock.now_ms, u64::MAX);
        assert_eq!(clock.after(2_000), u64::MAX);
        assert_eq!(clock.advance(100), 1_600);
        assert_eq!(clock.now_ms, u64::MAX);
    }

    #[test]
    fn shop_time_maps_progress_to_hours() {
        let mut clock = SimClock::new();
        clock.advance(300_000); // half of a 600s day
        let t = clock.shop_time(600_000, 9, 17);
        assert_eq!(t.format("%H:%M").to_string(), "13:00");
    }
}
