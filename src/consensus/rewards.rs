//! Block reward distribution
//!
//! Splits a block's reward (subsidy + fees) across participants in proportion
//! to their effective rate. This is a plain floating-point split: no remainder
//! is redistributed, so disbursed shares may differ from the amount by
//! rounding only.

use crate::ledger::ParticipantId;
use serde::{Deserialize, Serialize};

/// One participant's share of a block reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub participant: ParticipantId,
    pub amount: f64,
}

/// Total network weight with a floor.
///
/// The floor keeps the denominator positive with no participants and gives a
/// stable network-size reference. Negative and non-finite weights count as 0.
pub fn network_weight<I>(weights: I, floor: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let total: f64 = weights.into_iter().map(sanitize_weight).sum();
    total.max(floor)
}

/// Split `amount` as `amount * weight / total_weight`.
///
/// Participants with zero weight receive nothing and get no payout entry.
pub fn distribute_reward(
    amount: f64,
    weights: &[(ParticipantId, f64)],
    total_weight: f64,
) -> Vec<Payout> {
    if !(amount > 0.0) || !(total_weight > 0.0) {
        return Vec::new();
    }

    weights
        .iter()
        .filter_map(|(participant, weight)| {
            let weight = sanitize_weight(*weight);
            if weight > 0.0 {
                Some(Payout {
                    participant: participant.clone(),
                    amount: amount * weight / total_weight,
                })
            } else {
                None
            }
        })
        .collect()
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(values: &[(&str, f64)]) -> Vec<(ParticipantId, f64)> {
        values.iter().map(|(id, w)| (id.to_string(), *w)).collect()
    }

    #[test]
    fn test_proportional_split() {
        let w = weights(&[("a", 10.0), ("b", 0.0), ("c", 30.0)]);
        let total = network_weight(w.iter().map(|(_, w)| *w), 0.0);
        assert_eq!(total, 40.0);

        let payouts = distribute_reward(100.0, &w, total);
        assert_eq!(payouts.len(), 2);
        assert_eq!(payouts[0].participant, "a");
        assert_eq!(payouts[0].amount, 25.0);
        assert_eq!(payouts[1].participant, "c");
        assert_eq!(payouts[1].amount, 75.0);
    }

    #[test]
    fn test_floor_dilutes_small_network() {
        let w = weights(&[("a", 10.0)]);
        let total = network_weight(w.iter().map(|(_, w)| *w), 100.0);
        assert_eq!(total, 100.0);
        let payouts = distribute_reward(50.0, &w, total);
        assert_eq!(payouts[0].amount, 5.0);
    }

    #[test]
    fn test_floor_irrelevant_for_large_network() {
        assert_eq!(network_weight([60.0, 70.0], 100.0), 130.0);
    }

    #[test]
    fn test_empty_network_uses_floor() {
        assert_eq!(network_weight(std::iter::empty(), 100.0), 100.0);
        assert!(distribute_reward(50.0, &[], 100.0).is_empty());
    }

    #[test]
    fn test_bad_weights_ignored() {
        let w = weights(&[("a", -3.0), ("b", f64::NAN), ("c", 5.0)]);
        assert_eq!(network_weight(w.iter().map(|(_, w)| *w), 0.0), 5.0);
        let payouts = distribute_reward(10.0, &w, 5.0);
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].amount, 10.0);
    }

    #[test]
    fn test_nothing_to_distribute() {
        let w = weights(&[("a", 1.0)]);
        assert!(distribute_reward(0.0, &w, 1.0).is_empty());
    }
}
