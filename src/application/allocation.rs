//! Proportional allocation of a budget under per-item caps.
//!
//! Used at every level of the hierarchy: account budget across events and
//! top-level markets, event budget across its markets, and a market's
//! calculated limit across its runners.

use rust_decimal::Decimal;
use tracing::debug;

/// One recipient of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share {
    /// Relative weight; non-positive weights receive nothing.
    pub weight: Decimal,
    /// Maximum amount this recipient may receive.
    pub cap: Option<Decimal>,
}

impl Share {
    #[must_use]
    pub const fn new(weight: Decimal, cap: Option<Decimal>) -> Self {
        Self { weight, cap }
    }

    /// Unit weight capped at `cap`.
    #[must_use]
    pub const fn equal(cap: Decimal) -> Self {
        Self {
            weight: Decimal::ONE,
            cap: Some(cap),
        }
    }
}

/// Split `budget` across `shares` in proportion to their weights.
///
/// Recipients whose proportional share would exceed their cap are pinned at
/// the cap and the surplus is redistributed among the rest. After
/// `max_passes` redistribution passes the remaining shares are clipped to
/// their caps. The result never exceeds `budget` in total nor any cap
/// individually, and is never negative.
#[must_use]
pub fn distribute(budget: Decimal, shares: &[Share], max_passes: usize) -> Vec<Decimal> {
    let mut allocation = vec![Decimal::ZERO; shares.len()];
    if budget <= Decimal::ZERO {
        return allocation;
    }

    let mut pinned = vec![false; shares.len()];
    for (index, share) in shares.iter().enumerate() {
        if share.weight <= Decimal::ZERO || share.cap.is_some_and(|cap| cap <= Decimal::ZERO) {
            pinned[index] = true;
        }
    }

    for pass in 0..max_passes.max(1) {
        let spent = saturating_sum(
            allocation
                .iter()
                .zip(&pinned)
                .filter(|(_, pinned)| **pinned)
                .map(|(amount, _)| *amount),
        );
        let free = (budget - spent).max(Decimal::ZERO);
        let total_weight = saturating_sum(
            shares
                .iter()
                .zip(&pinned)
                .filter(|(_, pinned)| !**pinned)
                .map(|(share, _)| share.weight),
        );
        if total_weight <= Decimal::ZERO {
            break;
        }

        let mut capped = false;
        for (index, share) in shares.iter().enumerate() {
            if pinned[index] {
                continue;
            }
            let proposed = free.checked_mul(share.weight).map_or_else(
                || free * (share.weight / total_weight),
                |scaled| scaled / total_weight,
            );
            match share.cap {
                Some(cap) if proposed >= cap => {
                    allocation[index] = cap;
                    pinned[index] = true;
                    capped = true;
                }
                _ => allocation[index] = proposed,
            }
        }

        if !capped {
            debug!(passes = pass + 1, "Allocation converged");
            break;
        }
    }

    // rounding in the divisions above
    let total = saturating_sum(allocation.iter().copied());
    if total > budget {
        let scale = budget / total;
        for amount in &mut allocation {
            *amount *= scale;
        }
    }
    allocation
}

/// Sum that stops at [`Decimal::MAX`] instead of overflowing.
pub(crate) fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, |total, value| total.saturating_add(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn equal_weights_split_evenly() {
        let shares = [Share::new(dec!(1), None); 4];
        assert_eq!(distribute(dec!(100), &shares, 100), vec![dec!(25); 4]);
    }

    #[test]
    fn capped_surplus_goes_to_the_rest() {
        let shares = [
            Share::equal(dec!(10)),
            Share::equal(dec!(100)),
            Share::equal(dec!(100)),
        ];
        assert_eq!(
            distribute(dec!(90), &shares, 100),
            vec![dec!(10), dec!(40), dec!(40)]
        );
    }

    #[test]
    fn budget_beyond_caps_is_left_over() {
        let shares = [Share::equal(dec!(10)), Share::equal(dec!(20))];
        assert_eq!(distribute(dec!(1000), &shares, 100), vec![dec!(10), dec!(20)]);
    }

    #[test]
    fn weights_are_respected() {
        let shares = [Share::new(dec!(1), None), Share::new(dec!(3), None)];
        assert_eq!(distribute(dec!(100), &shares, 100), vec![dec!(25), dec!(75)]);
    }

    #[test]
    fn zero_weight_and_zero_budget_get_nothing() {
        let shares = [Share::new(dec!(0), None), Share::new(dec!(1), None)];
        assert_eq!(distribute(dec!(50), &shares, 100), vec![dec!(0), dec!(50)]);
        assert_eq!(distribute(dec!(0), &shares, 100), vec![dec!(0), dec!(0)]);
        assert_eq!(distribute(dec!(-5), &shares, 100), vec![dec!(0), dec!(0)]);
    }

    #[test]
    fn single_pass_still_respects_caps() {
        let shares = [
            Share::equal(dec!(1)),
            Share::equal(dec!(2)),
            Share::equal(dec!(50)),
        ];
        let result = distribute(dec!(90), &shares, 1);
        assert!(result.iter().zip(&shares).all(|(a, s)| *a <= s.cap.unwrap()));
        assert!(result.iter().sum::<Decimal>() <= dec!(90));
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let shares = [Share::equal(Decimal::MAX), Share::equal(Decimal::MAX)];
        let result = distribute(Decimal::MAX, &shares, 100);
        assert!(result.iter().all(|amount| *amount > Decimal::ZERO));

        let weighted = [Share::new(Decimal::MAX, None), Share::new(dec!(1), None)];
        let result = distribute(dec!(100), &weighted, 100);
        assert!(result[0] <= dec!(100));
        assert!(result[1] < dec!(0.0001));

        assert_eq!(saturating_sum([Decimal::MAX, Decimal::MAX]), Decimal::MAX);
    }

    fn share_strategy() -> impl Strategy<Value = Share> {
        (0u32..1000, proptest::option::of(0u32..10_000)).prop_map(|(weight, cap)| {
            Share::new(
                Decimal::new(i64::from(weight), 2),
                cap.map(|c| Decimal::new(i64::from(c), 1)),
            )
        })
    }

    proptest! {
        #[test]
        fn never_exceeds_budget_or_caps(
            budget in 0u32..100_000,
            shares in proptest::collection::vec(share_strategy(), 0..12),
        ) {
            let budget = Decimal::new(i64::from(budget), 1);
            let result = distribute(budget, &shares, 100);

            prop_assert_eq!(result.len(), shares.len());
            let total: Decimal = result.iter().sum();
            prop_assert!(total <= budget + dec!(0.000001));
            for (amount, share) in result.iter().zip(&shares) {
                prop_assert!(*amount >= Decimal::ZERO);
                if let Some(cap) = share.cap {
                    prop_assert!(*amount <= cap);
                }
            }
        }
    }
}
