//! Effective-importance scoring and capacity-bounded retention.

use crate::model::base_weight;

pub const HALF_LIFE_DAYS: f64 = 30.0;
pub const MAX_INSIGHTS: i64 = 1000;
pub const PRUNE_BATCH_SIZE: i64 = 10;

/// `EI = base_weight(importance) * max(1, ln(1 + access_count))
///       * 0.5^(days_since_access / 30) * (1 + 0.1 * min(edge_count, 5))`
pub fn compute_effective_importance(
    importance: u8,
    access_count: u32,
    days_since_access: f64,
    edge_count: i64,
) -> f64 {
    let base = base_weight(importance);
    let access_factor = (1.0 + access_count as f64).ln().max(1.0);
    let decay_factor = 0.5_f64.powf(days_since_access / HALF_LIFE_DAYS);
    let edges = edge_count.clamp(0, 5) as f64;
    let edge_factor = 1.0 + 0.1 * edges;
    base * access_factor * decay_factor * edge_factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_high_importance_insight_scores_near_base_weight() {
        let ei = compute_effective_importance(5, 0, 0.0, 0);
        assert!((ei - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decay_halves_after_half_life() {
        let fresh = compute_effective_importance(5, 0, 0.0, 0);
        let decayed = compute_effective_importance(5, 0, HALF_LIFE_DAYS, 0);
        assert!((decayed - fresh / 2.0).abs() < 1e-9);
    }

    #[test]
    fn edge_count_bonus_caps_at_five() {
        let at_five = compute_effective_importance(3, 0, 0.0, 5);
        let at_fifty = compute_effective_importance(3, 0, 0.0, 50);
        assert!((at_five - at_fifty).abs() < 1e-9);
    }

    #[test]
    fn access_factor_floors_at_one() {
        let zero_access = compute_effective_importance(3, 0, 0.0, 0);
        let one_access = compute_effective_importance(3, 1, 0.0, 0);
        assert!((zero_access - one_access).abs() < 1e-9);
    }
}
