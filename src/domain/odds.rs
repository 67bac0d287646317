//! Exchange price ladder.
//!
//! Only the single-tick step needed to quote one tick inside the best
//! opposing price is provided here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Lowest tradable odds.
pub const MIN_ODDS: Decimal = dec!(1.01);
/// Highest tradable odds.
pub const MAX_ODDS: Decimal = dec!(1000);

/// `(band lower bound, band upper bound, increment)`.
const BANDS: [(Decimal, Decimal, Decimal); 10] = [
    (dec!(1.01), dec!(2), dec!(0.01)),
    (dec!(2), dec!(3), dec!(0.02)),
    (dec!(3), dec!(4), dec!(0.05)),
    (dec!(4), dec!(6), dec!(0.1)),
    (dec!(6), dec!(10), dec!(0.2)),
    (dec!(10), dec!(20), dec!(0.5)),
    (dec!(20), dec!(30), dec!(1)),
    (dec!(30), dec!(50), dec!(2)),
    (dec!(50), dec!(100), dec!(5)),
    (dec!(100), dec!(1000), dec!(10)),
];

/// Whether `odds` lies inside the tradable range.
#[must_use]
pub fn is_tradable(odds: Decimal) -> bool {
    odds >= MIN_ODDS && odds <= MAX_ODDS
}

/// Whether `odds` is a price on the exchange ladder.
#[must_use]
pub fn is_on_ladder(odds: Decimal) -> bool {
    is_tradable(odds)
        && BANDS
            .iter()
            .find(|(_, upper, _)| odds <= *upper)
            .is_some_and(|(lower, _, step)| ((odds - lower) % step).is_zero())
}

/// `odds` itself when on the ladder, else the nearest ladder price above.
#[must_use]
pub fn snap_up(odds: Decimal) -> Option<Decimal> {
    if is_on_ladder(odds) {
        Some(odds)
    } else {
        tick_up(odds).filter(|price| is_tradable(*price))
    }
}

/// `odds` itself when on the ladder, else the nearest ladder price below.
#[must_use]
pub fn snap_down(odds: Decimal) -> Option<Decimal> {
    if is_on_ladder(odds) {
        Some(odds)
    } else {
        tick_down(odds).filter(|price| is_tradable(*price))
    }
}

/// Next ladder price strictly above `odds`, or `None` at the top of the ladder.
#[must_use]
pub fn tick_up(odds: Decimal) -> Option<Decimal> {
    if odds < MIN_ODDS {
        return Some(MIN_ODDS);
    }
    BANDS
        .iter()
        .find(|(_, upper, _)| odds < *upper)
        .map(|(lower, _, step)| {
            let steps = ((odds - lower) / step).floor();
            (lower + (steps + Decimal::ONE) * step).normalize()
        })
}

/// Next ladder price strictly below `odds`, or `None` at the bottom of the ladder.
#[must_use]
pub fn tick_down(odds: Decimal) -> Option<Decimal> {
    if odds <= MIN_ODDS {
        return None;
    }
    if odds > MAX_ODDS {
        return Some(MAX_ODDS);
    }
    BANDS
        .iter()
        .find(|(_, upper, _)| odds <= *upper)
        .map(|(lower, _, step)| {
            let steps = ((odds - lower) / step).ceil();
            (lower + (steps - Decimal::ONE) * step).normalize()
        })
}

/// Odds of the opposite outcome in a two-outcome market.
///
/// Backing one side at `odds` pays exactly like laying the other side at the
/// returned price.
#[must_use]
pub fn inverse(odds: Decimal) -> Option<Decimal> {
    if odds <= Decimal::ONE {
        return None;
    }
    Some(odds / (odds - Decimal::ONE))
}
