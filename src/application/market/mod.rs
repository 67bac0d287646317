//! Managed market: runner ownership, calculated limit and the management pass.

mod balance;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::allocation::{distribute, saturating_sum, Share};
use super::replication::{MarketState, ReplicationCommand};
use super::runner::{ManageContext, ManagedRunner, RunnerRules};
use super::settings::{LimitSettings, MAX_AMOUNT_LIMIT};
use crate::domain::{EventId, MarketBook, MarketExposure, MarketId, MarketOrders, MarketStatus, RunnerId};
use crate::port::OrderExecutor;

/// How a management pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// No live book, or the market is not open.
    Unavailable,
    /// Market is in play or about to start; positions were flattened.
    ExposureRemoved,
    /// A runner breached its caps and corrective orders were issued.
    Corrected,
    /// The calculated limit is too old to grow exposure on.
    Stale,
    /// Two-runner market with inconsistent rules; unmatched orders cancelled.
    TwoWayInvalid,
    Balanced,
}

/// A market under management. Sole owner of its runners.
#[derive(Debug)]
pub struct ManagedMarket {
    market_id: MarketId,
    event_id: Option<EventId>,
    amount_limit: Option<Decimal>,
    calculated_limit: Decimal,
    calculated_limit_stamp: Option<DateTime<Utc>>,
    exposure: MarketExposure,
    runners: BTreeMap<RunnerId, ManagedRunner>,
    settings: Arc<LimitSettings>,
}

impl ManagedMarket {
    #[must_use]
    pub fn new(market_id: MarketId, settings: Arc<LimitSettings>) -> Self {
        Self {
            market_id,
            event_id: None,
            amount_limit: None,
            calculated_limit: Decimal::ZERO,
            calculated_limit_stamp: None,
            exposure: MarketExposure::default(),
            runners: BTreeMap::new(),
            settings,
        }
    }

    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    #[must_use]
    pub const fn event_id(&self) -> Option<&EventId> {
        self.event_id.as_ref()
    }

    pub(crate) fn set_event(&mut self, event_id: Option<EventId>) {
        self.event_id = event_id;
    }

    /// User override of the market's limit.
    #[must_use]
    pub const fn amount_limit(&self) -> Option<Decimal> {
        self.amount_limit
    }

    #[must_use]
    pub const fn calculated_limit(&self) -> Decimal {
        self.calculated_limit
    }

    #[must_use]
    pub const fn calculated_limit_stamp(&self) -> Option<DateTime<Utc>> {
        self.calculated_limit_stamp
    }

    /// Exposure as of the last [`Self::calculate_exposure`].
    #[must_use]
    pub const fn exposure(&self) -> MarketExposure {
        self.exposure
    }

    #[must_use]
    pub fn runner(&self, runner_id: &RunnerId) -> Option<&ManagedRunner> {
        self.runners.get(runner_id)
    }

    pub fn runners(&self) -> impl Iterator<Item = &ManagedRunner> {
        self.runners.values()
    }

    #[must_use]
    pub fn runner_count(&self) -> usize {
        self.runners.len()
    }

    /// Most this market can absorb: the override when set, otherwise the
    /// sum of each runner's larger cap.
    #[must_use]
    pub fn capacity(&self) -> Decimal {
        self.amount_limit.unwrap_or_else(|| {
            saturating_sum(
                self.runners
                    .values()
                    .map(|runner| runner.back_amount_limit().max(runner.lay_amount_limit())),
            )
        })
    }

    /// Set or clear the override. Returns the command to publish on change.
    pub fn set_amount_limit(&mut self, limit: Option<Decimal>) -> Option<ReplicationCommand> {
        let limit = limit.map(|limit| limit.max(Decimal::ZERO));
        if limit.is_some_and(|limit| limit > MAX_AMOUNT_LIMIT) {
            warn!(market_id = %self.market_id, limit = ?limit, "Rejecting market limit above the largest amount");
            return None;
        }
        if self.amount_limit == limit {
            return None;
        }
        self.amount_limit = limit;
        info!(market_id = %self.market_id, limit = ?limit, "Market amount limit set");
        Some(ReplicationCommand::SetMarketAmountLimit {
            market_id: self.market_id.clone(),
            limit,
        })
    }

    /// Create a runner if missing. Returns the command to publish on creation.
    pub fn add_runner(&mut self, runner_id: RunnerId) -> Option<ReplicationCommand> {
        if self.runners.contains_key(&runner_id) {
            return None;
        }
        self.runners
            .insert(runner_id, ManagedRunner::new(self.market_id.clone(), runner_id));
        debug!(market_id = %self.market_id, runner = %runner_id, "Runner added");
        Some(ReplicationCommand::AddRunner {
            market_id: self.market_id.clone(),
            runner_id,
        })
    }

    /// Apply rules to a runner, creating it on first reference.
    pub fn update_runner(&mut self, runner_id: RunnerId, rules: &RunnerRules) -> Vec<ReplicationCommand> {
        let mut commands: Vec<ReplicationCommand> = self.add_runner(runner_id).into_iter().collect();
        if let Some(runner) = self.runners.get_mut(&runner_id) {
            commands.extend(runner.update(rules));
        }
        if !commands.is_empty() {
            self.calculate_ideal_exposures();
        }
        commands
    }

    /// Set the limit allocated by the registry.
    ///
    /// Decreases always apply. Increases apply only when `can_increase`, and
    /// increases inside the dead-band only refresh the timestamp. A `now`
    /// older than the stored timestamp is discarded.
    pub fn set_calculated_limit(
        &mut self,
        limit: Decimal,
        can_increase: bool,
        now: DateTime<Utc>,
    ) -> Option<ReplicationCommand> {
        let limit = limit.max(Decimal::ZERO);
        if let Some(stamp) = self.calculated_limit_stamp {
            if now < stamp {
                warn!(market_id = %self.market_id, %now, %stamp, "Calculated limit timestamp went backwards");
                return None;
            }
        }

        let current = self.calculated_limit;
        if limit >= current && !can_increase {
            return None;
        }
        let deadband = self
            .settings
            .deadband_absolute
            .max(current * self.settings.deadband_relative);
        let applied = if limit < current || limit - current >= deadband {
            limit
        } else {
            current
        };

        self.calculated_limit_stamp = Some(now);
        if applied != current {
            self.calculated_limit = applied;
            debug!(
                market_id = %self.market_id,
                from = %current,
                to = %applied,
                "Calculated limit changed"
            );
            self.calculate_ideal_exposures();
        }
        Some(ReplicationCommand::SetCalculatedLimit {
            market_id: self.market_id.clone(),
            limit: applied,
            stamp: now,
        })
    }

    /// Whether the calculated limit is fresh enough to grow exposure on.
    #[must_use]
    pub fn is_calculated_limit_recent(&self, now: DateTime<Utc>) -> bool {
        self.calculated_limit_stamp.is_some_and(|stamp| {
            now.signed_duration_since(stamp)
                .to_std()
                .map_or(true, |age| age <= self.settings.calculated_limit_max_age)
        })
    }

    /// Refresh every runner from live orders and aggregate the worst outcome.
    pub fn calculate_exposure(&mut self, orders: &MarketOrders, executor: &dyn OrderExecutor) -> MarketExposure {
        for runner in self.runners.values_mut() {
            let runner_id = runner.runner_id();
            runner.refresh_exposure(orders.orders(&runner_id), executor);
        }
        self.exposure = MarketExposure::from_runners(self.runners.values().map(ManagedRunner::exposure));
        self.exposure
    }

    /// Split the calculated limit across runners, weighted by
    /// `1 / (back odds - 1)` and capped at each runner's back limit.
    pub fn calculate_ideal_exposures(&mut self) {
        let shares: Vec<Share> = self
            .runners
            .values()
            .map(|runner| {
                let weight = runner
                    .weighting_odds()
                    .filter(|odds| *odds > Decimal::ONE)
                    .map_or(Decimal::ZERO, |odds| Decimal::ONE / (odds - Decimal::ONE));
                Share::new(weight, Some(runner.back_amount_limit()))
            })
            .collect();
        let ideals = distribute(
            self.calculated_limit,
            &shares,
            self.settings.max_distribution_passes,
        );
        for (runner, ideal) in self.runners.values_mut().zip(ideals) {
            let ideal = ideal.round_dp(2).min(runner.back_amount_limit());
            runner.set_ideal_back_exposure(ideal);
        }
    }

    /// Whether a two-runner market is configured as one book: each runner's
    /// back limit mirrors the other's lay limit, and the odds bounds are
    /// complementary probabilities.
    #[must_use]
    pub fn is_two_way_valid(&self) -> bool {
        let mut runners = self.runners.values();
        let (Some(a), Some(b), None) = (runners.next(), runners.next(), runners.next()) else {
            return false;
        };

        let tolerance = self.settings.limit_tolerance;
        let odds_tolerance = self.settings.two_way_odds_tolerance;
        let complementary = |back: Option<Decimal>, lay: Option<Decimal>| match (back, lay) {
            (Some(back), Some(lay)) => {
                (Decimal::ONE / back + Decimal::ONE / lay - Decimal::ONE).abs() <= odds_tolerance
            }
            _ => false,
        };

        (a.back_amount_limit() - b.lay_amount_limit()).abs() <= tolerance
            && (a.lay_amount_limit() - b.back_amount_limit()).abs() <= tolerance
            && complementary(a.min_back_odds(), b.max_lay_odds())
            && complementary(b.min_back_odds(), a.max_lay_odds())
    }

    /// Cancel every unmatched order on every runner.
    pub fn cancel_all_unmatched(&mut self, orders: &MarketOrders, ctx: &ManageContext<'_>) -> usize {
        self.runners
            .values_mut()
            .map(|runner| {
                let runner_id = runner.runner_id();
                runner.cancel_unmatched(orders.orders(&runner_id), ctx)
            })
            .sum()
    }

    /// One reconciliation cycle against the live cache.
    pub fn manage(&mut self, ctx: &ManageContext<'_>) -> PassOutcome {
        let Some(book) = ctx.cache.market(&self.market_id) else {
            debug!(market_id = %self.market_id, "No live book, skipping");
            return PassOutcome::Unavailable;
        };
        if book.status() != MarketStatus::Open {
            debug!(market_id = %self.market_id, status = ?book.status(), "Market not open, skipping");
            return PassOutcome::Unavailable;
        }
        let orders = ctx
            .cache
            .orders(&self.market_id)
            .unwrap_or_else(|| Arc::new(MarketOrders::new(self.market_id.clone())));

        self.calculate_exposure(&orders, ctx.executor);
        for runner in self.runners.values_mut() {
            let runner_id = runner.runner_id();
            runner.calculate_odds(book.runner(&runner_id), orders.orders(&runner_id), ctx);
        }

        if self.is_closing(&book, ctx) {
            for runner in self.runners.values_mut() {
                let runner_orders = orders.orders(&runner.runner_id());
                runner.remove_exposure(runner_orders, ctx);
            }
            info!(market_id = %self.market_id, in_play = book.is_in_play(), "Exposure removed");
            return PassOutcome::ExposureRemoved;
        }

        let mut corrected = false;
        for runner in self.runners.values_mut() {
            let runner_orders = orders.orders(&runner.runner_id());
            corrected |= runner.check_runner_limits(runner_orders, ctx);
        }
        if corrected {
            return PassOutcome::Corrected;
        }

        self.calculate_ideal_exposures();
        if !self.is_calculated_limit_recent(ctx.now) {
            debug!(market_id = %self.market_id, "Calculated limit is stale, not balancing");
            return PassOutcome::Stale;
        }

        if self.runners.len() == 2 {
            if !self.is_two_way_valid() {
                warn!(market_id = %self.market_id, "Two-way rules are inconsistent, cancelling");
                self.cancel_all_unmatched(&orders, ctx);
                return PassOutcome::TwoWayInvalid;
            }
            self.balance_two_way(&orders, ctx);
        } else {
            self.balance_n_way(&orders, ctx);
        }
        PassOutcome::Balanced
    }

    /// Replicated form of the market.
    #[must_use]
    pub fn state(&self) -> MarketState {
        MarketState {
            market_id: self.market_id.clone(),
            event_id: self.event_id.clone(),
            amount_limit: self.amount_limit,
            calculated_limit: self.calculated_limit,
            calculated_limit_stamp: self.calculated_limit_stamp,
            runners: self.runners.values().map(ManagedRunner::state).collect(),
        }
    }

    fn is_closing(&self, book: &MarketBook, ctx: &ManageContext<'_>) -> bool {
        if book.is_in_play() {
            return true;
        }
        let window = chrono::Duration::from_std(self.settings.remove_exposure_before_start)
            .unwrap_or_else(|_| chrono::Duration::zero());
        book.start_time()
            .is_some_and(|start| start - ctx.now <= window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::testkit::domain::{matched, open_market, resting_back, runner, runner_book};
    use crate::testkit::harness::Harness;
    use rust_decimal_macros::dec;

    fn market() -> ManagedMarket {
        ManagedMarket::new(MarketId::from("1.1"), Arc::new(LimitSettings::default()))
    }

    fn symmetric_rules(odds: Decimal, limit: Decimal) -> RunnerRules {
        RunnerRules::default()
            .with_min_back_odds(odds)
            .with_max_lay_odds(odds)
            .with_back_limit(limit)
            .with_lay_limit(limit)
    }

    fn two_way() -> ManagedMarket {
        let mut market = market();
        market.update_runner(runner(1), &symmetric_rules(dec!(2.0), dec!(100)));
        market.update_runner(runner(2), &symmetric_rules(dec!(2.0), dec!(100)));
        market
    }

    #[test]
    fn decreases_always_apply() {
        let harness = Harness::new();
        let mut market = market();
        assert!(market.set_calculated_limit(dec!(100), true, harness.now).is_some());
        assert_eq!(market.calculated_limit(), dec!(100));

        assert!(market.set_calculated_limit(dec!(40), false, harness.now).is_some());
        assert_eq!(market.calculated_limit(), dec!(40));
    }

    #[test]
    fn increases_need_permission() {
        let harness = Harness::new();
        let mut market = market();
        assert!(market.set_calculated_limit(dec!(100), false, harness.now).is_none());
        assert_eq!(market.calculated_limit(), dec!(0));
        assert_eq!(market.calculated_limit_stamp(), None);
    }

    #[test]
    fn small_increases_only_refresh_the_stamp() {
        let harness = Harness::new();
        let mut market = market();
        market.set_calculated_limit(dec!(200), true, harness.now);

        let later = harness.now + chrono::Duration::seconds(30);
        // 2% of 200 is 4
        let command = market.set_calculated_limit(dec!(203), true, later);
        assert_eq!(market.calculated_limit(), dec!(200));
        assert_eq!(market.calculated_limit_stamp(), Some(later));
        assert_eq!(
            command,
            Some(ReplicationCommand::SetCalculatedLimit {
                market_id: MarketId::from("1.1"),
                limit: dec!(200),
                stamp: later,
            })
        );

        market.set_calculated_limit(dec!(204), true, later);
        assert_eq!(market.calculated_limit(), dec!(204));
    }

    #[test]
    fn negative_limit_clamps_to_zero() {
        let harness = Harness::new();
        let mut market = market();
        market.set_calculated_limit(dec!(50), true, harness.now);
        market.set_calculated_limit(dec!(-10), true, harness.now);
        assert_eq!(market.calculated_limit(), dec!(0));
    }

    #[test]
    fn older_timestamp_is_discarded() {
        let harness = Harness::new();
        let mut market = market();
        market.set_calculated_limit(dec!(50), true, harness.now);

        let earlier = harness.now - chrono::Duration::seconds(1);
        assert!(market.set_calculated_limit(dec!(10), true, earlier).is_none());
        assert_eq!(market.calculated_limit(), dec!(50));
    }

    #[test]
    fn recency_is_bounded() {
        let harness = Harness::new();
        let mut market = market();
        assert!(!market.is_calculated_limit_recent(harness.now));

        market.set_calculated_limit(dec!(50), true, harness.now);
        assert!(market.is_calculated_limit_recent(harness.now + chrono::Duration::minutes(5)));
        assert!(!market.is_calculated_limit_recent(harness.now + chrono::Duration::minutes(6)));
    }

    #[test]
    fn equal_odds_share_equally() {
        let harness = Harness::new();
        let mut market = market();
        for selection in 1..=3 {
            market.update_runner(runner(selection), &symmetric_rules(dec!(3.0), dec!(500)));
        }
        market.set_calculated_limit(dec!(300), true, harness.now);

        for managed in market.runners() {
            assert_eq!(managed.ideal_back_exposure(), dec!(100));
        }
    }

    #[test]
    fn shorter_odds_carry_more_weight_and_caps_hold() {
        let harness = Harness::new();
        let mut market = market();
        market.update_runner(runner(1), &symmetric_rules(dec!(2.0), dec!(500)));
        market.update_runner(runner(2), &symmetric_rules(dec!(5.0), dec!(500)));
        market.update_runner(runner(3), &symmetric_rules(dec!(5.0), dec!(10)));
        market.set_calculated_limit(dec!(150), true, harness.now);

        let ideal = |selection| market.runner(&runner(selection)).unwrap().ideal_back_exposure();
        assert_eq!(ideal(3), dec!(10));
        // weights 1 and 0.25 share the remaining 140
        assert_eq!(ideal(1), dec!(112));
        assert_eq!(ideal(2), dec!(28));
    }

    #[test]
    fn two_way_validity() {
        let mut market = two_way();
        assert!(market.is_two_way_valid());

        market.update_runner(runner(1), &RunnerRules::default().with_back_limit(dec!(50)));
        assert!(!market.is_two_way_valid());
    }

    #[test]
    fn two_way_needs_complementary_odds() {
        let mut market = two_way();
        market.update_runner(runner(2), &RunnerRules::default().with_max_lay_odds(dec!(2.5)));
        assert!(!market.is_two_way_valid());
    }

    #[test]
    fn three_runners_are_never_two_way() {
        let mut market = two_way();
        market.update_runner(runner(3), &symmetric_rules(dec!(2.0), dec!(100)));
        assert!(!market.is_two_way_valid());
    }

    #[test]
    fn capacity_prefers_override() {
        let mut market = two_way();
        assert_eq!(market.capacity(), dec!(200));
        market.set_amount_limit(Some(dec!(80)));
        assert_eq!(market.capacity(), dec!(80));
        assert!(market.set_amount_limit(Some(dec!(80))).is_none());
    }

    #[test]
    fn exposure_aggregates_runners() {
        let harness = Harness::new();
        let mut market = two_way();
        let orders = MarketOrders::new(MarketId::from("1.1"))
            .with_order(runner(1), matched("a", Side::Back, dec!(2.0), dec!(30)))
            .with_order(runner(2), resting_back("b", dec!(2.0), dec!(20)));

        // runner 2 winning loses runner 1's matched stake
        let exposure = market.calculate_exposure(&orders, &harness.executor);
        assert_eq!(exposure.matched, dec!(30));
        assert_eq!(exposure.total, dec!(30));
    }

    #[test]
    fn manage_skips_missing_and_closed_markets() {
        let harness = Harness::new();
        let mut market = two_way();
        assert_eq!(market.manage(&harness.ctx()), PassOutcome::Unavailable);

        harness
            .cache
            .update_market(open_market("1.1", []).with_status(MarketStatus::Suspended));
        assert_eq!(market.manage(&harness.ctx()), PassOutcome::Unavailable);
        assert!(harness.executor.placed().is_empty());
    }

    #[test]
    fn manage_removes_exposure_in_play() {
        let harness = Harness::new();
        let mut market = two_way();
        harness
            .cache
            .update_market(open_market("1.1", []).with_in_play(true));
        harness.cache.update_orders(
            MarketId::from("1.1"),
            MarketOrders::new(MarketId::from("1.1"))
                .with_order(runner(1), matched("a", Side::Back, dec!(2.0), dec!(10)))
                .with_order(runner(2), resting_back("b", dec!(2.0), dec!(5))),
        );

        assert_eq!(market.manage(&harness.ctx()), PassOutcome::ExposureRemoved);
        assert_eq!(harness.executor.cancels().len(), 1);
        let placed = harness.executor.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].runner_id, runner(1));
        assert_eq!(placed[0].side, Side::Lay);
        assert_eq!(placed[0].size, dec!(10));
    }

    #[test]
    fn manage_removes_exposure_before_start() {
        let harness = Harness::new();
        let mut market = two_way();
        harness.cache.update_market(
            open_market("1.1", []).with_start_time(harness.now + chrono::Duration::minutes(30)),
        );
        assert_eq!(market.manage(&harness.ctx()), PassOutcome::ExposureRemoved);
    }

    #[test]
    fn manage_without_recent_limit_does_not_grow() {
        let harness = Harness::new();
        let mut market = two_way();
        harness.cache.update_market(open_market("1.1", []));

        assert_eq!(market.manage(&harness.ctx()), PassOutcome::Stale);
        assert!(harness.executor.placed().is_empty());
    }

    #[test]
    fn invalid_two_way_cancels_unmatched() {
        let harness = Harness::new();
        let mut market = two_way();
        market.update_runner(runner(1), &RunnerRules::default().with_back_limit(dec!(50)));
        market.set_calculated_limit(dec!(100), true, harness.now);
        harness.cache.update_market(open_market("1.1", []));
        harness.cache.update_orders(
            MarketId::from("1.1"),
            MarketOrders::new(MarketId::from("1.1"))
                .with_order(runner(2), resting_back("b", dec!(2.0), dec!(5))),
        );

        assert_eq!(market.manage(&harness.ctx()), PassOutcome::TwoWayInvalid);
        assert_eq!(harness.executor.cancels().len(), 1);
        assert!(harness.executor.placed().is_empty());
    }

    #[test]
    fn n_way_backs_the_gap() {
        let harness = Harness::new();
        let mut market = market();
        for selection in 1..=3 {
            market.update_runner(runner(selection), &symmetric_rules(dec!(3.0), dec!(500)));
        }
        market.set_calculated_limit(dec!(300), true, harness.now);
        harness.cache.update_market(open_market(
            "1.1",
            (1..=3).map(|selection| runner_book(selection, &[], &[(dec!(3.1), dec!(100))])),
        ));
        harness.cache.update_orders(
            MarketId::from("1.1"),
            MarketOrders::new(MarketId::from("1.1"))
                .with_order(runner(1), matched("a", Side::Back, dec!(3.0), dec!(40))),
        );

        assert_eq!(market.manage(&harness.ctx()), PassOutcome::Balanced);
        let placed = harness.executor.placed();
        assert_eq!(placed.len(), 3);
        assert!(placed.iter().all(|order| order.side == Side::Back && order.price == dec!(3.05)));
        assert_eq!(placed[0].size, dec!(60));
        assert_eq!(placed[1].size, dec!(100));
    }

    fn over_limit_runner(harness: &Harness, orders: MarketOrders) -> ManagedMarket {
        let mut market = market();
        market.update_runner(
            runner(1),
            &RunnerRules::default()
                .with_min_back_odds(dec!(3.0))
                .with_back_limit(dec!(10)),
        );
        // target back price 3.05
        harness
            .cache
            .update_market(open_market("1.1", [runner_book(1, &[], &[(dec!(3.1), dec!(100))])]));
        harness.cache.update_orders(MarketId::from("1.1"), orders);
        market
    }

    #[test]
    fn stale_cancel_is_seen_by_limit_checks() {
        let harness = Harness::new();
        let mut market = over_limit_runner(
            &harness,
            MarketOrders::new(MarketId::from("1.1"))
                .with_order(runner(1), resting_back("stale", dec!(2.5), dec!(30)))
                .with_order(runner(1), matched("m", Side::Back, dec!(3.0), dec!(1))),
        );

        // without the stale bet the runner is inside its limit
        assert_eq!(market.manage(&harness.ctx()), PassOutcome::Stale);
        let cancels = harness.executor.cancels();
        assert_eq!(cancels.len(), 1);
        assert_eq!(cancels[0].bet_id.as_str(), "stale");
        assert_eq!(cancels[0].size_reduction, None);
    }

    #[test]
    fn limit_checks_reduce_bets_not_already_cancelled() {
        let harness = Harness::new();
        let mut market = over_limit_runner(
            &harness,
            MarketOrders::new(MarketId::from("1.1"))
                .with_order(runner(1), resting_back("stale", dec!(2.5), dec!(30)))
                .with_order(runner(1), resting_back("fresh", dec!(3.05), dec!(30)))
                .with_order(runner(1), matched("m", Side::Back, dec!(3.0), dec!(1))),
        );

        assert_eq!(market.manage(&harness.ctx()), PassOutcome::Corrected);
        let cancels: Vec<(String, Option<Decimal>)> = harness
            .executor
            .cancels()
            .iter()
            .map(|cancel| (cancel.bet_id.to_string(), cancel.size_reduction))
            .collect();
        assert_eq!(
            cancels,
            vec![("stale".to_string(), None), ("fresh".to_string(), Some(dec!(21)))]
        );
        assert!(harness.executor.placed().is_empty());
    }

    #[test]
    fn oversized_market_limit_is_rejected() {
        let mut market = two_way();
        assert!(market.set_amount_limit(Some(Decimal::MAX)).is_none());
        assert_eq!(market.amount_limit(), None);
        assert_eq!(market.capacity(), dec!(200));
    }

    #[test]
    fn two_way_fills_through_the_better_price() {
        let harness = Harness::new();
        let mut market = two_way();
        market.set_calculated_limit(dec!(100), true, harness.now);
        harness.cache.update_market(open_market(
            "1.1",
            [
                runner_book(1, &[(dec!(1.98), dec!(100))], &[(dec!(2.04), dec!(100))]),
                runner_book(2, &[(dec!(1.98), dec!(100))], &[(dec!(2.04), dec!(100))]),
            ],
        ));

        assert_eq!(market.manage(&harness.ctx()), PassOutcome::Balanced);
        let placed = harness.executor.placed();
        assert_eq!(placed.len(), 2);
        for order in &placed {
            assert_eq!(order.side, Side::Back);
            assert_eq!(order.price, dec!(2.02));
            assert_eq!(order.size, dec!(50));
        }
    }
}
