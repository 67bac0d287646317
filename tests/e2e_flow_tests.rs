mod support;

use limitkeeper::application::PassOutcome;
use limitkeeper::domain::{MarketId, Side};
use limitkeeper::testkit::domain::runner;
use limitkeeper::testkit::harness::fixed_now;
use rust_decimal_macros::dec;

use support::{engine, even_money_market, ideal};

#[test]
fn two_runner_market_is_two_way_with_equal_ideals() {
    let engine = engine(dec!(1000));
    let market_id = MarketId::from("1.100");
    assert_eq!(engine.rules.add_market(market_id.clone(), None), Ok(true));
    assert_eq!(engine.rules.add_runner(&market_id, runner(1)), Ok(true));
    assert_eq!(engine.rules.add_runner(&market_id, runner(2)), Ok(true));
    even_money_market(&engine, "1.100", dec!(100));

    assert_eq!(engine.rules.calculate_market_limits_at(fixed_now()), 1);

    let (limit, two_way) = engine
        .rules
        .inspect_market(&market_id, |market| {
            (market.calculated_limit(), market.is_two_way_valid())
        })
        .unwrap();
    assert_eq!(limit, dec!(100));
    assert!(two_way);
    assert_eq!(ideal(&engine, "1.100", 1), Some(dec!(50)));
    assert_eq!(ideal(&engine, "1.100", 2), Some(dec!(50)));
}

#[test]
fn two_way_turns_invalid_when_limits_diverge() {
    let engine = engine(dec!(1000));
    even_money_market(&engine, "1.100", dec!(100));
    assert!(engine.rules.execute_command("runner 1.100 1 backLimit=40"));

    let two_way = engine
        .rules
        .inspect_market(&MarketId::from("1.100"), |market| market.is_two_way_valid());
    assert_eq!(two_way, Some(false));
}

#[test]
fn management_pass_backs_both_runners() {
    let engine = engine(dec!(1000));
    even_money_market(&engine, "1.100", dec!(100));
    let now = fixed_now();
    engine.rules.calculate_market_limits_at(now);

    assert_eq!(
        engine.rules.manage_market_at(&MarketId::from("1.100"), now),
        Some(PassOutcome::Balanced)
    );
    let placed = engine.executor.placed();
    assert_eq!(placed.len(), 2);
    for order in &placed {
        assert_eq!(order.side, Side::Back);
        assert_eq!(order.price, dec!(2.02));
        assert_eq!(order.size, dec!(50));
    }
    assert_eq!(engine.rules.frequency().orders_this_hour_at(now), 2);
}

#[test]
fn invalid_two_way_market_is_not_balanced() {
    let engine = engine(dec!(1000));
    even_money_market(&engine, "1.100", dec!(100));
    engine.rules.execute_command("runner 1.100 2 minBackOdds=3.0");
    let now = fixed_now();
    engine.rules.calculate_market_limits_at(now);

    assert_eq!(
        engine.rules.manage_market_at(&MarketId::from("1.100"), now),
        Some(PassOutcome::TwoWayInvalid)
    );
    assert!(engine.executor.placed().is_empty());
}

#[test]
fn three_equal_runners_share_the_limit() {
    let engine = engine(dec!(1000));
    for selection in 1..=3 {
        engine.rules.execute_command(&format!(
            "runner 1.300 {selection} minBackOdds=3.0 backLimit=500 layLimit=500"
        ));
    }
    engine.rules.execute_command("market 1.300 amountLimit=300");
    engine.rules.calculate_market_limits_at(fixed_now());

    for selection in 1..=3 {
        assert_eq!(ideal(&engine, "1.300", selection), Some(dec!(100)));
    }
}

#[test]
fn event_budget_is_split_across_member_markets() {
    let engine = engine(dec!(1000));
    even_money_market(&engine, "1.1", dec!(100));
    even_money_market(&engine, "1.2", dec!(100));
    for id in ["1.1", "1.2"] {
        engine
            .rules
            .add_market(MarketId::from(id), Some("e7".into()))
            .unwrap();
    }
    assert!(engine.rules.execute_command("event e7 amountLimit=60"));

    for id in ["1.1", "1.2"] {
        let limit = engine
            .rules
            .inspect_market(&MarketId::from(id), |market| market.calculated_limit());
        assert_eq!(limit, Some(dec!(30)));
    }
}

#[test]
fn account_shortfall_shrinks_every_market() {
    let engine = engine(dec!(1000));
    even_money_market(&engine, "1.1", dec!(100));
    even_money_market(&engine, "1.2", dec!(100));
    let now = fixed_now();
    engine.rules.calculate_market_limits_at(now);

    engine.rules.funds().update_account(dec!(100), dec!(40));
    engine
        .rules
        .calculate_market_limits_at(now + chrono::Duration::seconds(1));

    for id in ["1.1", "1.2"] {
        let limit = engine
            .rules
            .inspect_market(&MarketId::from(id), |market| market.calculated_limit());
        assert_eq!(limit, Some(dec!(30)));
    }
}
