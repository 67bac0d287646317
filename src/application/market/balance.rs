//! Moving actual back exposure towards each runner's ideal share.

use rust_decimal::Decimal;
use tracing::debug;

use super::ManagedMarket;
use crate::application::runner::ManageContext;
use crate::domain::{odds, MarketOrders, RunnerId, Side};

impl ManagedMarket {
    /// Back under-exposed runners for the gap; shrink over-exposed ones by
    /// cancelling unmatched backs, then laying off matched excess.
    pub(super) fn balance_n_way(&mut self, orders: &MarketOrders, ctx: &ManageContext<'_>) -> bool {
        let tolerance = ctx.settings.limit_tolerance;
        let mut acted = false;

        for runner in self.runners.values_mut() {
            let runner_orders = orders.orders(&runner.runner_id());
            let ideal = runner.ideal_back_exposure();
            let actual = runner.exposure().total(Side::Back);

            if ideal > actual + tolerance {
                if let Some(price) = runner.back_odds() {
                    acted |= runner.place_order(ctx, Side::Back, price, ideal - actual) > Decimal::ZERO;
                }
            } else if actual > ideal + tolerance {
                acted |= runner.reduce_unmatched(Side::Back, actual - ideal, runner_orders, ctx)
                    > Decimal::ZERO;
                let matched = runner.exposure().matched(Side::Back);
                if matched > ideal + tolerance {
                    if let Some(price) = runner.lay_odds() {
                        acted |= runner.place_order(ctx, Side::Lay, price, matched - ideal) > Decimal::ZERO;
                    }
                }
            }
        }
        acted
    }

    /// In a two-runner book, backing one runner and laying the other are the
    /// same position. Each runner's gap is filled through whichever of the
    /// two offers the better effective back price.
    pub(super) fn balance_two_way(&mut self, orders: &MarketOrders, ctx: &ManageContext<'_>) -> bool {
        let ids: Vec<RunnerId> = self.runners.keys().copied().collect();
        let [first, second] = ids.as_slice() else {
            return false;
        };
        let (first, second) = (*first, *second);

        let mut acted = false;
        for (own, other) in [(first, second), (second, first)] {
            acted |= self.balance_pair(own, other, orders, ctx);
        }
        acted
    }

    fn balance_pair(
        &mut self,
        own: RunnerId,
        other: RunnerId,
        orders: &MarketOrders,
        ctx: &ManageContext<'_>,
    ) -> bool {
        let tolerance = ctx.settings.limit_tolerance;
        let (Some(own_runner), Some(other_runner)) = (self.runners.get(&own), self.runners.get(&other))
        else {
            return false;
        };

        // losing on `own` is winning on `other`
        let ideal = own_runner.ideal_back_exposure();
        let actual = own_runner.exposure().total(Side::Back) + other_runner.exposure().total(Side::Lay);
        let back_price = own_runner.back_odds();
        let lay_price = other_runner.lay_odds();

        if ideal > actual + tolerance {
            let gap = ideal - actual;
            let via_lay = lay_price.and_then(odds::inverse);
            let lay_is_better = match (back_price, via_lay) {
                (Some(back), Some(effective)) => effective > back,
                (None, Some(_)) => true,
                _ => false,
            };
            debug!(
                market_id = %self.market_id,
                runner = %own,
                %gap,
                via_lay = lay_is_better,
                "Two-way gap"
            );

            if lay_is_better {
                let (Some(price), Some(runner)) = (lay_price, self.runners.get_mut(&other)) else {
                    return false;
                };
                let stake = gap / (price - Decimal::ONE);
                runner.place_order(ctx, Side::Lay, price, stake) > Decimal::ZERO
            } else {
                let (Some(price), Some(runner)) = (back_price, self.runners.get_mut(&own)) else {
                    return false;
                };
                runner.place_order(ctx, Side::Back, price, gap) > Decimal::ZERO
            }
        } else if actual > ideal + tolerance {
            let excess = actual - ideal;
            let mut reduced = Decimal::ZERO;
            if let Some(runner) = self.runners.get_mut(&own) {
                reduced = runner.reduce_unmatched(Side::Back, excess, orders.orders(&own), ctx);
            }
            if excess - reduced > tolerance {
                if let Some(runner) = self.runners.get_mut(&other) {
                    reduced += runner.reduce_unmatched(Side::Lay, excess - reduced, orders.orders(&other), ctx);
                }
            }
            reduced > Decimal::ZERO
        } else {
            false
        }
    }
}
