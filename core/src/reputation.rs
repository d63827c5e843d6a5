//! Customer satisfaction and shop reputation.
//!
//! Two scalars moved by the same per-customer outcome counts:
//! satisfaction is the day-summary figure in [0,100]; reputation sits in
//! [1,100] and sets how often new customers arrive. Both carry across days.

use crate::config::{ReputationConfig, SatisfactionConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatisfactionTracker {
    value:  f64,
    params: SatisfactionConfig,
}

impl SatisfactionTracker {
    pub fn new(params: SatisfactionConfig) -> Self {
        Self { value: params.initial.clamp(params.min, params.max), params }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Apply one customer's outcome. Returns the delta actually applied
    /// after clamping.
    pub fn apply_outcome(&mut self, expensive: usize, not_found: usize, purchased: usize) -> f64 {
        let p = &self.params;
        let raw = -p.expensive_penalty * expensive as f64
            - p.not_found_penalty * not_found as f64
            + p.purchase_reward * purchased as f64;
        let before = self.value;
        self.value = (before + raw).clamp(p.min, p.max);
        self.value - before
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationTracker {
    value:  f64,
    params: ReputationConfig,
}

impl ReputationTracker {
    pub fn new(params: ReputationConfig) -> Self {
        Self { value: params.initial.clamp(params.min, params.max), params }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// `all_found` doubles the purchase reward when every desired item was
    /// bought. Returns the clamped delta.
    pub fn apply_outcome(&mut self, purchased: usize, not_found: usize, all_found: bool) -> f64 {
        let p = &self.params;
        let multiplier = if all_found { p.all_found_multiplier } else { 1.0 };
        let raw = p.purchase_reward * purchased as f64 * multiplier
            - p.not_found_penalty * not_found as f64;
        let before = self.value;
        self.value = (before + raw).clamp(p.min, p.max);
        self.value - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShopConfig;

    #[test]
    fn satisfaction_starts_full_and_never_exceeds_bounds() {
        let mut s = SatisfactionTracker::new(ShopConfig::default_test().satisfaction);
        assert_eq!(s.value(), 100.0);
        assert_eq!(s.apply_outcome(0, 0, 5), 0.0);

        let delta = s.apply_outcome(2, 1, 1);
        assert!((delta - (-1.0 - 0.2 + 0.3)).abs() < 1e-9);

        for _ in 0..500 {
            s.apply_outcome(3, 3, 0);
        }
        assert_eq!(s.value(), 0.0);
    }

    #[test]
    fn reputation_rewards_complete_baskets() {
        let cfg = ShopConfig::default_test().reputation;
        let mut partial = ReputationTracker::new(cfg.clone());
        let mut complete = ReputationTracker::new(cfg);

        let d1 = partial.apply_outcome(3, 1, false);
        let d2 = complete.apply_outcome(3, 0, true);

        assert!((d1 - (0.3 - 0.02)).abs() < 1e-9);
        assert!((d2 - 0.6).abs() < 1e-9);
        assert!(complete.value() > partial.value());
    }

    #[test]
    fn reputation_floor_is_one() {
        let mut r = ReputationTracker::new(ShopConfig::default_test().reputation);
        for _ in 0..1_000 {
            r.apply_outcome(0, 10, false);
        }
        assert_eq!(r.value(), 1.0);
        for _ in 0..10_000 {
            r.apply_outcome(10, 0, true);
        }
        assert_eq!(r.value(), 100.0);
    }
}
