//! Per-runner limits, tradable odds and order placement.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

use super::frequency::BetFrequencyLimit;
use super::replication::{ReplicationCommand, RunnerRule, RunnerState};
use super::settings::{LimitSettings, MAX_AMOUNT_LIMIT};
use crate::domain::{odds, BetId, CurrentOrder, MarketId, RunnerBook, RunnerExposure, RunnerId, Side};
use crate::port::{CancelRequest, MarketCache, OrderExecutor};

/// Collaborators and parameters of one management pass.
pub struct ManageContext<'a> {
    pub cache: &'a dyn MarketCache,
    pub executor: &'a dyn OrderExecutor,
    pub frequency: &'a BetFrequencyLimit,
    pub settings: &'a LimitSettings,
    /// Exchange minimum stake in account currency.
    pub min_order_size: Decimal,
    pub now: DateTime<Utc>,
}

/// Partial update of a runner's rules; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerRules {
    pub min_back_odds: Option<Decimal>,
    pub max_lay_odds: Option<Decimal>,
    pub back_amount_limit: Option<Decimal>,
    pub lay_amount_limit: Option<Decimal>,
}

impl RunnerRules {
    #[must_use]
    pub const fn with_min_back_odds(mut self, odds: Decimal) -> Self {
        self.min_back_odds = Some(odds);
        self
    }

    #[must_use]
    pub const fn with_max_lay_odds(mut self, odds: Decimal) -> Self {
        self.max_lay_odds = Some(odds);
        self
    }

    #[must_use]
    pub const fn with_back_limit(mut self, limit: Decimal) -> Self {
        self.back_amount_limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_lay_limit(mut self, limit: Decimal) -> Self {
        self.lay_amount_limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min_back_odds.is_none()
            && self.max_lay_odds.is_none()
            && self.back_amount_limit.is_none()
            && self.lay_amount_limit.is_none()
    }
}

/// One selection of a managed market.
///
/// A side is enabled once its odds bound is set: `min_back_odds` for backs,
/// `max_lay_odds` for lays. Limits are expressed as exposure: back stake for
/// the back side, lay liability for the lay side.
#[derive(Debug, Clone)]
pub struct ManagedRunner {
    market_id: MarketId,
    runner_id: RunnerId,
    min_back_odds: Option<Decimal>,
    max_lay_odds: Option<Decimal>,
    back_amount_limit: Decimal,
    lay_amount_limit: Decimal,
    back_odds: Option<Decimal>,
    lay_odds: Option<Decimal>,
    ideal_back_exposure: Decimal,
    exposure: RunnerExposure,
    /// Bets cancelled since the last exposure refresh.
    cancelled: HashSet<BetId>,
}

impl ManagedRunner {
    #[must_use]
    pub fn new(market_id: MarketId, runner_id: RunnerId) -> Self {
        Self {
            market_id,
            runner_id,
            min_back_odds: None,
            max_lay_odds: None,
            back_amount_limit: Decimal::ZERO,
            lay_amount_limit: Decimal::ZERO,
            back_odds: None,
            lay_odds: None,
            ideal_back_exposure: Decimal::ZERO,
            exposure: RunnerExposure::default(),
            cancelled: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn runner_id(&self) -> RunnerId {
        self.runner_id
    }

    #[must_use]
    pub const fn min_back_odds(&self) -> Option<Decimal> {
        self.min_back_odds
    }

    #[must_use]
    pub const fn max_lay_odds(&self) -> Option<Decimal> {
        self.max_lay_odds
    }

    #[must_use]
    pub const fn back_amount_limit(&self) -> Decimal {
        self.back_amount_limit
    }

    #[must_use]
    pub const fn lay_amount_limit(&self) -> Decimal {
        self.lay_amount_limit
    }

    /// Exposure cap on `side`.
    #[must_use]
    pub const fn limit(&self, side: Side) -> Decimal {
        match side {
            Side::Back => self.back_amount_limit,
            Side::Lay => self.lay_amount_limit,
        }
    }

    /// Tradable back odds from the last pass.
    #[must_use]
    pub const fn back_odds(&self) -> Option<Decimal> {
        self.back_odds
    }

    /// Tradable lay odds from the last pass.
    #[must_use]
    pub const fn lay_odds(&self) -> Option<Decimal> {
        self.lay_odds
    }

    /// Tradable odds on `side`.
    #[must_use]
    pub const fn odds(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Back => self.back_odds,
            Side::Lay => self.lay_odds,
        }
    }

    /// Back odds used for weighting: tradable odds once known, the minimum
    /// back odds before the first pass.
    #[must_use]
    pub fn weighting_odds(&self) -> Option<Decimal> {
        self.back_odds.or(self.min_back_odds)
    }

    #[must_use]
    pub const fn ideal_back_exposure(&self) -> Decimal {
        self.ideal_back_exposure
    }

    pub(crate) fn set_ideal_back_exposure(&mut self, ideal: Decimal) {
        self.ideal_back_exposure = ideal.max(Decimal::ZERO);
    }

    #[must_use]
    pub const fn exposure(&self) -> &RunnerExposure {
        &self.exposure
    }

    /// Replicated form of the runner's rules.
    #[must_use]
    pub fn state(&self) -> RunnerState {
        RunnerState {
            runner_id: self.runner_id,
            min_back_odds: self.min_back_odds,
            max_lay_odds: self.max_lay_odds,
            back_amount_limit: self.back_amount_limit,
            lay_amount_limit: self.lay_amount_limit,
        }
    }

    /// Apply a partial rule update. Returns one command per changed field.
    pub fn update(&mut self, rules: &RunnerRules) -> Vec<ReplicationCommand> {
        let mut changed = Vec::new();

        // bounds become order prices, so they snap inwards to the ladder
        if let Some(requested) = rules.min_back_odds {
            match odds::is_tradable(requested).then(|| odds::snap_up(requested)).flatten() {
                None => warn!(runner = %self.runner_id, odds = %requested, "Rejecting min back odds outside the ladder"),
                Some(odds) if self.min_back_odds != Some(odds) => {
                    if odds != requested {
                        debug!(runner = %self.runner_id, %requested, %odds, "Min back odds snapped to the ladder");
                    }
                    self.min_back_odds = Some(odds);
                    changed.push(RunnerRule::MinBackOdds(odds));
                }
                Some(_) => {}
            }
        }
        if let Some(requested) = rules.max_lay_odds {
            match odds::is_tradable(requested).then(|| odds::snap_down(requested)).flatten() {
                None => warn!(runner = %self.runner_id, odds = %requested, "Rejecting max lay odds outside the ladder"),
                Some(odds) if self.max_lay_odds != Some(odds) => {
                    if odds != requested {
                        debug!(runner = %self.runner_id, %requested, %odds, "Max lay odds snapped to the ladder");
                    }
                    self.max_lay_odds = Some(odds);
                    changed.push(RunnerRule::MaxLayOdds(odds));
                }
                Some(_) => {}
            }
        }
        if let Some(limit) = rules.back_amount_limit {
            let limit = limit.max(Decimal::ZERO);
            if limit > MAX_AMOUNT_LIMIT {
                warn!(runner = %self.runner_id, %limit, "Rejecting back limit above the largest amount");
            } else if self.back_amount_limit != limit {
                self.back_amount_limit = limit;
                changed.push(RunnerRule::BackAmountLimit(limit));
            }
        }
        if let Some(limit) = rules.lay_amount_limit {
            let limit = limit.max(Decimal::ZERO);
            if limit > MAX_AMOUNT_LIMIT {
                warn!(runner = %self.runner_id, %limit, "Rejecting lay limit above the largest amount");
            } else if self.lay_amount_limit != limit {
                self.lay_amount_limit = limit;
                changed.push(RunnerRule::LayAmountLimit(limit));
            }
        }

        if !changed.is_empty() {
            debug!(
                market_id = %self.market_id,
                runner = %self.runner_id,
                fields = changed.len(),
                "Runner rules updated"
            );
        }
        changed
            .into_iter()
            .map(|rule| ReplicationCommand::SetRunnerRule {
                market_id: self.market_id.clone(),
                runner_id: self.runner_id,
                rule,
            })
            .collect()
    }

    /// Rebuild the exposure snapshot from live orders plus in-flight ones.
    ///
    /// Starts a new pass: cancels issued earlier are forgotten.
    pub fn refresh_exposure(&mut self, orders: &[CurrentOrder], executor: &dyn OrderExecutor) {
        let mut exposure = RunnerExposure::from_orders(orders);
        executor.fold_in_flight(&self.market_id, &self.runner_id, &mut exposure);
        self.exposure = exposure;
        self.cancelled.clear();
    }

    /// Whether a cancel for `bet_id` was issued in the current pass.
    #[must_use]
    pub fn is_cancelled(&self, bet_id: &BetId) -> bool {
        self.cancelled.contains(bet_id)
    }

    /// Derive tradable odds from the book and cancel unmatched orders that
    /// are priced worse than the new target or are unlikely to be reached.
    ///
    /// Returns the number of cancels issued.
    pub fn calculate_odds(
        &mut self,
        book: Option<&RunnerBook>,
        orders: &[CurrentOrder],
        ctx: &ManageContext<'_>,
    ) -> usize {
        self.back_odds = self.min_back_odds.map(|min| {
            book.and_then(RunnerBook::best_available_to_lay)
                .and_then(|level| odds::tick_down(level.price()))
                .map_or(min, |price| price.max(min))
        });
        self.lay_odds = self.max_lay_odds.map(|max| {
            book.and_then(RunnerBook::best_available_to_back)
                .and_then(|level| odds::tick_up(level.price()))
                .map_or(max, |price| price.min(max))
        });

        let multiple = ctx.settings.hard_to_reach_multiple;
        let mut cancelled = 0;
        for order in orders.iter().filter(|order| order.is_unmatched()) {
            let stale = match (order.side, self.odds(order.side)) {
                (_, None) => true,
                (Side::Back, Some(target)) => order.price < target,
                (Side::Lay, Some(target)) => order.price > target,
            };
            let queued = book.map_or(Decimal::ZERO, |book| match order.side {
                Side::Back => book.back_liquidity_ahead_of(order.price),
                Side::Lay => book.lay_liability_ahead_of(order.price),
            });
            let unreachable = queued > order.size_remaining * multiple;

            if stale || unreachable {
                debug!(
                    runner = %self.runner_id,
                    bet_id = %order.bet_id,
                    side = %order.side,
                    price = %order.price,
                    stale,
                    unreachable,
                    "Cancelling unmatched order"
                );
                if self.cancel(ctx, order, None) {
                    cancelled += 1;
                }
            }
        }
        cancelled
    }

    /// Bring each side back under its cap: cancel unmatched exposure first,
    /// then offset any matched excess on the opposite side.
    ///
    /// Returns whether any corrective action was issued.
    pub fn check_runner_limits(&mut self, orders: &[CurrentOrder], ctx: &ManageContext<'_>) -> bool {
        let tolerance = ctx.settings.limit_tolerance;
        let mut acted = false;

        for side in [Side::Back, Side::Lay] {
            let limit = self.limit(side);
            let total = self.exposure.total(side);
            if total <= limit + tolerance {
                continue;
            }
            warn!(
                market_id = %self.market_id,
                runner = %self.runner_id,
                %side,
                %total,
                %limit,
                "Runner exposure over limit"
            );
            acted |= self.reduce_unmatched(side, total - limit, orders, ctx) > Decimal::ZERO;

            let matched = self.exposure.matched(side);
            if matched > limit + tolerance {
                acted |= self.offset(side, matched - limit, ctx) > Decimal::ZERO;
            }
        }
        acted
    }

    /// Cancel every unmatched order and hedge the matched position so that
    /// winning and losing pay the same, regardless of limits.
    pub fn remove_exposure(&mut self, orders: &[CurrentOrder], ctx: &ManageContext<'_>) -> bool {
        let mut acted = self.cancel_unmatched(orders, ctx) > 0;

        let wins = self.exposure.outcome_if_wins();
        let loses = self.exposure.outcome_if_loses();
        if wins > loses {
            if let Some(price) = self.lay_odds.or(self.max_lay_odds) {
                acted |= self.submit(ctx, Side::Lay, price, (wins - loses) / price) > Decimal::ZERO;
            } else {
                warn!(runner = %self.runner_id, "No lay price to hedge with");
            }
        } else if loses > wins {
            if let Some(price) = self.back_odds.or(self.min_back_odds) {
                acted |= self.submit(ctx, Side::Back, price, (loses - wins) / price) > Decimal::ZERO;
            } else {
                warn!(runner = %self.runner_id, "No back price to hedge with");
            }
        }
        acted
    }

    /// Cancel every unmatched order. Returns how many cancels were accepted.
    pub fn cancel_unmatched(&mut self, orders: &[CurrentOrder], ctx: &ManageContext<'_>) -> usize {
        let mut cancelled = 0;
        for order in orders.iter().filter(|order| order.is_unmatched()) {
            if self.cancel(ctx, order, None) {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Submit an order clipped to the remaining limit on `side`.
    ///
    /// Returns the submitted size; zero when nothing was placed.
    pub fn place_order(
        &mut self,
        ctx: &ManageContext<'_>,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Decimal {
        let available = self.limit(side) - self.exposure.raw_total(side);
        let max_size = match side {
            Side::Back => available,
            Side::Lay if price > Decimal::ONE => available / (price - Decimal::ONE),
            Side::Lay => Decimal::ZERO,
        };
        self.submit(ctx, side, price, size.min(max_size))
    }

    /// Reduce unmatched exposure on `side` by up to `amount`, worst-priced
    /// orders first, partially cancelling the last one.
    ///
    /// Returns the exposure covered by the issued cancels.
    pub fn reduce_unmatched(
        &mut self,
        side: Side,
        amount: Decimal,
        orders: &[CurrentOrder],
        ctx: &ManageContext<'_>,
    ) -> Decimal {
        let mut unmatched: Vec<&CurrentOrder> = orders
            .iter()
            .filter(|order| order.side == side && order.is_unmatched())
            .filter(|order| !self.cancelled.contains(&order.bet_id))
            .collect();
        match side {
            Side::Back => unmatched.sort_by(|a, b| a.price.cmp(&b.price)),
            Side::Lay => unmatched.sort_by(|a, b| b.price.cmp(&a.price)),
        }

        let mut remaining = amount;
        for order in unmatched {
            if remaining <= Decimal::ZERO {
                break;
            }
            let per_unit = match side {
                Side::Back => Decimal::ONE,
                Side::Lay => order.price - Decimal::ONE,
            };
            let exposure = order.size_remaining * per_unit;
            if exposure <= remaining {
                if self.cancel(ctx, order, None) {
                    remaining -= exposure;
                }
            } else if per_unit > Decimal::ZERO {
                let reduction = (remaining / per_unit)
                    .round_dp_with_strategy(2, RoundingStrategy::AwayFromZero)
                    .min(order.size_remaining);
                if self.cancel(ctx, order, Some(reduction)) {
                    remaining = Decimal::ZERO;
                }
            }
        }
        amount - remaining
    }

    /// Offset `excess` matched exposure on `side` with an opposite order.
    fn offset(&mut self, side: Side, excess: Decimal, ctx: &ManageContext<'_>) -> Decimal {
        let opposite = side.opposite();
        let Some(price) = self.odds(opposite) else {
            warn!(runner = %self.runner_id, %side, %excess, "No price to offset matched excess");
            return Decimal::ZERO;
        };
        let size = match side {
            // a lay stake cancels the same back stake
            Side::Back => excess,
            // back profit covers lay liability
            Side::Lay if price > Decimal::ONE => excess / (price - Decimal::ONE),
            Side::Lay => return Decimal::ZERO,
        };
        self.submit(ctx, opposite, price, size)
    }

    fn submit(&mut self, ctx: &ManageContext<'_>, side: Side, price: Decimal, size: Decimal) -> Decimal {
        let size = size.round_dp_with_strategy(2, RoundingStrategy::ToZero);
        if size <= Decimal::ZERO || size < ctx.min_order_size {
            debug!(
                runner = %self.runner_id,
                %side,
                %size,
                min = %ctx.min_order_size,
                "Order below minimum size, skipping"
            );
            return Decimal::ZERO;
        }

        let submitted = ctx
            .executor
            .place_order(&self.market_id, &self.runner_id, side, price, size);
        if submitted > Decimal::ZERO {
            ctx.frequency.record_order_at(ctx.now);
            self.exposure.add_in_flight(side, price, submitted);
            info!(
                market_id = %self.market_id,
                runner = %self.runner_id,
                %side,
                %price,
                size = %submitted,
                executor = ctx.executor.name(),
                "Order submitted"
            );
        }
        submitted
    }

    /// Issue a cancel and take its exposure out of the snapshot. A bet is
    /// cancelled at most once per pass.
    fn cancel(&mut self, ctx: &ManageContext<'_>, order: &CurrentOrder, size_reduction: Option<Decimal>) -> bool {
        if self.cancelled.contains(&order.bet_id) {
            return false;
        }
        let request = CancelRequest {
            market_id: self.market_id.clone(),
            runner_id: self.runner_id,
            side: order.side,
            price: order.price,
            size: order.size_remaining,
            bet_id: order.bet_id.clone(),
            size_reduction,
        };
        if !ctx.executor.cancel_order(&request) {
            return false;
        }
        let size = size_reduction.unwrap_or(order.size_remaining);
        self.exposure.remove_unmatched(order.side, order.price, size);
        self.cancelled.insert(order.bet_id.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{matched, resting_back, resting_lay, runner, runner_book};
    use crate::testkit::executor::RecordingExecutor;
    use crate::testkit::harness::Harness;
    use rust_decimal_macros::dec;

    fn managed(rules: RunnerRules) -> ManagedRunner {
        let mut managed = ManagedRunner::new(MarketId::from("1.1"), runner(1));
        managed.update(&rules);
        managed
    }

    fn default_rules() -> RunnerRules {
        RunnerRules::default()
            .with_min_back_odds(dec!(2.0))
            .with_max_lay_odds(dec!(3.0))
            .with_back_limit(dec!(100))
            .with_lay_limit(dec!(100))
    }

    #[test]
    fn repeated_update_changes_nothing() {
        let mut runner = ManagedRunner::new(MarketId::from("1.1"), runner(1));
        assert_eq!(runner.update(&default_rules()).len(), 4);
        assert!(runner.update(&default_rules()).is_empty());

        let changed = runner.update(&RunnerRules::default().with_back_limit(dec!(50)));
        assert_eq!(
            changed,
            vec![ReplicationCommand::SetRunnerRule {
                market_id: MarketId::from("1.1"),
                runner_id: runner.runner_id(),
                rule: RunnerRule::BackAmountLimit(dec!(50)),
            }]
        );
    }

    #[test]
    fn negative_limits_clamp_and_bad_odds_are_rejected() {
        let mut runner = managed(default_rules());
        let changed = runner.update(
            &RunnerRules::default()
                .with_lay_limit(dec!(-5))
                .with_min_back_odds(dec!(1.0))
                .with_max_lay_odds(dec!(1001)),
        );
        assert_eq!(changed.len(), 1);
        assert_eq!(runner.lay_amount_limit(), dec!(0));
        assert_eq!(runner.min_back_odds(), Some(dec!(2.0)));
        assert_eq!(runner.max_lay_odds(), Some(dec!(3.0)));
    }

    #[test]
    fn oversized_limits_are_rejected() {
        let mut runner = managed(default_rules());
        let changed = runner.update(
            &RunnerRules::default()
                .with_back_limit(Decimal::MAX)
                .with_lay_limit(MAX_AMOUNT_LIMIT),
        );
        assert_eq!(changed.len(), 1);
        assert_eq!(runner.back_amount_limit(), dec!(100));
        assert_eq!(runner.lay_amount_limit(), MAX_AMOUNT_LIMIT);
    }

    #[test]
    fn odds_bounds_snap_inwards_to_the_ladder() {
        let harness = Harness::new();
        let mut runner = managed(
            RunnerRules::default()
                .with_min_back_odds(dec!(2.01))
                .with_max_lay_odds(dec!(3.01)),
        );
        assert_eq!(runner.min_back_odds(), Some(dec!(2.02)));
        assert_eq!(runner.max_lay_odds(), Some(dec!(3)));

        runner.calculate_odds(None, &[], &harness.ctx());
        assert_eq!(runner.back_odds(), Some(dec!(2.02)));
        assert_eq!(runner.lay_odds(), Some(dec!(3)));
        // snapped value repeated is no change
        assert!(runner
            .update(&RunnerRules::default().with_min_back_odds(dec!(2.01)))
            .is_empty());
    }

    #[test]
    fn odds_sit_one_tick_inside_the_book() {
        let harness = Harness::new();
        let mut runner = managed(default_rules());
        let book = runner_book(1, &[(dec!(2.1), dec!(50))], &[(dec!(2.2), dec!(40))]);

        runner.calculate_odds(Some(&book), &[], &harness.ctx());
        assert_eq!(runner.back_odds(), Some(dec!(2.18)));
        assert_eq!(runner.lay_odds(), Some(dec!(2.12)));
    }

    #[test]
    fn odds_fall_back_to_bounds() {
        let harness = Harness::new();
        let mut runner = managed(default_rules().with_min_back_odds(dec!(2.5)));
        let book = runner_book(1, &[(dec!(4.0), dec!(50))], &[(dec!(2.2), dec!(40))]);

        runner.calculate_odds(Some(&book), &[], &harness.ctx());
        assert_eq!(runner.back_odds(), Some(dec!(2.5)));
        assert_eq!(runner.lay_odds(), Some(dec!(3.0)));

        runner.calculate_odds(None, &[], &harness.ctx());
        assert_eq!(runner.back_odds(), Some(dec!(2.5)));
        assert_eq!(runner.lay_odds(), Some(dec!(3.0)));
    }

    #[test]
    fn disabled_side_has_no_odds() {
        let harness = Harness::new();
        let mut runner = managed(RunnerRules::default().with_back_limit(dec!(10)));
        runner.calculate_odds(None, &[resting_back("b", dec!(2), dec!(5))], &harness.ctx());

        assert_eq!(runner.back_odds(), None);
        assert_eq!(harness.executor.cancels().len(), 1);
    }

    #[test]
    fn stale_and_unreachable_orders_are_cancelled() {
        let harness = Harness::new();
        let mut runner = managed(default_rules());
        let book = runner_book(
            1,
            &[(dec!(2.1), dec!(50))],
            &[(dec!(2.2), dec!(40)), (dec!(2.3), dec!(100))],
        );
        let orders = vec![
            resting_back("stale", dec!(2.1), dec!(10)),
            resting_back("far", dec!(2.5), dec!(10)),
            resting_back("ok", dec!(2.3), dec!(100)),
            resting_lay("lay", dec!(2.1), dec!(30)),
        ];

        let cancelled = runner.calculate_odds(Some(&book), &orders, &harness.ctx());
        assert_eq!(cancelled, 2);
        let ids: Vec<String> = harness
            .executor
            .cancels()
            .iter()
            .map(|c| c.bet_id.to_string())
            .collect();
        assert_eq!(ids, vec!["stale", "far"]);
    }

    #[test]
    fn a_bet_is_cancelled_once_per_pass() {
        let harness = Harness::new();
        let mut runner = managed(default_rules());
        let book = runner_book(1, &[(dec!(2.1), dec!(50))], &[(dec!(2.2), dec!(40))]);
        let orders = vec![resting_back("stale", dec!(2.1), dec!(10))];
        runner.refresh_exposure(&orders, &harness.executor);

        assert_eq!(runner.calculate_odds(Some(&book), &orders, &harness.ctx()), 1);
        assert!(runner.is_cancelled(&orders[0].bet_id));
        assert_eq!(runner.exposure().total(Side::Back), dec!(0));
        assert_eq!(runner.cancel_unmatched(&orders, &harness.ctx()), 0);
        assert_eq!(harness.executor.cancels().len(), 1);

        runner.refresh_exposure(&orders, &harness.executor);
        assert!(!runner.is_cancelled(&orders[0].bet_id));
        assert_eq!(runner.exposure().total(Side::Back), dec!(10));
    }

    #[test]
    fn place_order_clips_to_remaining_limit() {
        let harness = Harness::new();
        let mut runner = managed(default_rules().with_back_limit(dec!(50)).with_lay_limit(dec!(20)));
        let orders = vec![matched("m", Side::Back, dec!(2.0), dec!(20))];
        runner.refresh_exposure(&orders, &harness.executor);

        let ctx = harness.ctx();
        assert_eq!(runner.place_order(&ctx, Side::Back, dec!(2.0), dec!(100)), dec!(30));
        // 20 of matched back profit frees lay liability
        assert_eq!(runner.place_order(&ctx, Side::Lay, dec!(3.0), dec!(50)), dec!(20));
        assert_eq!(harness.frequency.orders_this_hour_at(harness.now), 2);
    }

    #[test]
    fn place_order_skips_below_minimum() {
        let harness = Harness::new();
        let mut runner = managed(default_rules().with_back_limit(dec!(21)));
        let orders = vec![matched("m", Side::Back, dec!(2.0), dec!(20))];
        runner.refresh_exposure(&orders, &harness.executor);

        assert_eq!(runner.place_order(&harness.ctx(), Side::Back, dec!(2.0), dec!(10)), dec!(0));
        assert!(harness.executor.placed().is_empty());
        assert_eq!(harness.frequency.orders_this_hour_at(harness.now), 0);
    }

    #[test]
    fn in_flight_orders_count_against_the_limit() {
        let executor = RecordingExecutor::new().with_in_flight(
            "1.1",
            runner(1),
            Side::Back,
            dec!(2.0),
            dec!(95),
        );
        let harness = Harness::new().with_executor(executor);
        let mut runner = managed(default_rules());
        runner.refresh_exposure(&[], &harness.executor);

        assert_eq!(runner.exposure().total(Side::Back), dec!(95));
        assert_eq!(runner.place_order(&harness.ctx(), Side::Back, dec!(2.0), dec!(10)), dec!(5));
    }

    #[test]
    fn over_limit_cancels_worst_priced_first() {
        let harness = Harness::new();
        let mut runner = managed(default_rules().with_back_limit(dec!(10)));
        let orders = vec![
            resting_back("b", dec!(3.0), dec!(8)),
            resting_back("a", dec!(2.0), dec!(8)),
            matched("m", Side::Back, dec!(2.0), dec!(5)),
        ];
        runner.refresh_exposure(&orders, &harness.executor);

        assert!(runner.check_runner_limits(&orders, &harness.ctx()));
        let cancels = harness.executor.cancels();
        assert_eq!(cancels.len(), 2);
        assert_eq!(cancels[0].bet_id.as_str(), "a");
        assert_eq!(cancels[0].size_reduction, None);
        assert_eq!(cancels[1].bet_id.as_str(), "b");
        assert_eq!(cancels[1].size_reduction, Some(dec!(3)));
        assert!(harness.executor.placed().is_empty());
    }

    #[test]
    fn matched_excess_is_offset_on_the_other_side() {
        let harness = Harness::new();
        let mut runner = managed(default_rules().with_back_limit(dec!(10)).with_max_lay_odds(dec!(5)));
        let book = runner_book(1, &[(dec!(2.0), dec!(100))], &[]);
        let orders = vec![matched("m", Side::Back, dec!(2.0), dec!(30))];
        runner.refresh_exposure(&orders, &harness.executor);
        runner.calculate_odds(Some(&book), &orders, &harness.ctx());

        assert!(runner.check_runner_limits(&orders, &harness.ctx()));
        let placed = harness.executor.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].side, Side::Lay);
        assert_eq!(placed[0].price, dec!(2.02));
        assert_eq!(placed[0].size, dec!(20));
    }

    #[test]
    fn within_limits_does_nothing() {
        let harness = Harness::new();
        let mut runner = managed(default_rules());
        let orders = vec![resting_back("a", dec!(2.0), dec!(50))];
        runner.refresh_exposure(&orders, &harness.executor);

        assert!(!runner.check_runner_limits(&orders, &harness.ctx()));
        assert!(harness.executor.cancels().is_empty());
    }

    #[test]
    fn remove_exposure_cancels_and_hedges() {
        let harness = Harness::new();
        let mut runner = managed(default_rules());
        let orders = vec![
            matched("m", Side::Back, dec!(3.0), dec!(10)),
            resting_back("r", dec!(4.0), dec!(5)),
        ];
        runner.refresh_exposure(&orders, &harness.executor);
        runner.calculate_odds(None, &[], &harness.ctx());

        assert!(runner.remove_exposure(&orders, &harness.ctx()));
        assert_eq!(harness.executor.cancels().len(), 1);
        let placed = harness.executor.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].side, Side::Lay);
        assert_eq!(placed[0].price, dec!(3.0));
        assert_eq!(placed[0].size, dec!(10));
    }

    #[test]
    fn flat_position_needs_no_hedge() {
        let harness = Harness::new();
        let mut runner = managed(default_rules());
        runner.refresh_exposure(&[], &harness.executor);

        assert!(!runner.remove_exposure(&[], &harness.ctx()));
        assert!(harness.executor.placed().is_empty());
    }
}
