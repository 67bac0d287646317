//! Shared setup for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use limitkeeper::adapter::outbound::MemoryMarketCache;
use limitkeeper::application::{
    BetFrequencyLimit, ExistingFunds, FrequencySettings, LimitSettings, Replicator, RulesManager,
};
use limitkeeper::domain::MarketId;
use limitkeeper::testkit::domain::{open_market, runner, runner_book};
use limitkeeper::testkit::executor::RecordingExecutor;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A registry wired to an in-memory cache and a recording executor.
pub struct Engine {
    pub rules: Arc<RulesManager>,
    pub cache: Arc<MemoryMarketCache>,
    pub executor: Arc<RecordingExecutor>,
}

pub fn engine(available_funds: Decimal) -> Engine {
    let cache = Arc::new(MemoryMarketCache::new());
    let executor = Arc::new(RecordingExecutor::new());
    let funds = Arc::new(ExistingFunds::new(Arc::new(Replicator::new()), dec!(0), dec!(1)));
    funds.update_account(available_funds, dec!(0));

    let rules = Arc::new(RulesManager::new(
        LimitSettings::default(),
        funds,
        Arc::new(BetFrequencyLimit::new(FrequencySettings::default())),
        cache.clone(),
        executor.clone(),
    ));
    Engine {
        rules,
        cache,
        executor,
    }
}

/// Even-money two-runner market: rules on the registry, prices in the cache.
pub fn even_money_market(engine: &Engine, market_id: &str, amount_limit: Decimal) {
    for selection in [1, 2] {
        engine.rules.execute_command(&format!(
            "runner {market_id} {selection} minBackOdds=2.0 maxLayOdds=2.0 backLimit=50 layLimit=50"
        ));
    }
    assert!(engine
        .rules
        .execute_command(&format!("market {market_id} amountLimit={amount_limit}")));

    engine.cache.update_market(open_market(
        market_id,
        [
            runner_book(1, &[(dec!(1.98), dec!(100))], &[(dec!(2.04), dec!(100))]),
            runner_book(2, &[(dec!(1.98), dec!(100))], &[(dec!(2.04), dec!(100))]),
        ],
    ));
}

/// Ideal back exposure of a runner, if the market and runner exist.
pub fn ideal(engine: &Engine, market_id: &str, selection: u64) -> Option<Decimal> {
    engine
        .rules
        .inspect_market(&MarketId::from(market_id), |market| {
            market
                .runner(&runner(selection))
                .map(|runner| runner.ideal_back_exposure())
        })
        .flatten()
}
