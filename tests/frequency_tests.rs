use std::time::Duration;

use chrono::{TimeZone, Utc};
use limitkeeper::application::{BetFrequencyLimit, FrequencySettings};
use rust_decimal_macros::dec;

#[test]
fn period_grows_strictly_with_hourly_usage() {
    let governor = BetFrequencyLimit::new(FrequencySettings::default());
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

    let mut previous = None;
    let mut recorded = 0;
    for target in (0..=900).step_by(100) {
        while recorded < target {
            assert!(governor.record_order_at(now));
            recorded += 1;
        }
        let period = governor.manage_market_period_at(dec!(500), dec!(1000), now);
        assert!(period >= Duration::from_secs(1));
        assert!(period <= Duration::from_secs(600));
        if let Some(previous) = previous {
            assert!(period > previous, "{target} orders: {period:?} <= {previous:?}");
        }
        previous = Some(period);
    }
}

#[test]
fn period_stays_within_bounds() {
    let governor = BetFrequencyLimit::new(FrequencySettings::default());
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    for (market, total) in [
        (dec!(1000), dec!(1000)),
        (dec!(5000), dec!(1000)),
        (dec!(1), dec!(1000000)),
        (dec!(0), dec!(1000)),
        (dec!(10), dec!(0)),
    ] {
        let period = governor.manage_market_period_at(market, total, now);
        assert!(period >= Duration::from_secs(1), "{market}/{total}: {period:?}");
        assert!(period <= Duration::from_secs(600), "{market}/{total}: {period:?}");
    }
}

#[test]
fn exhausted_budget_waits_the_maximum() {
    let settings = FrequencySettings {
        orders_per_hour: 10,
        ..FrequencySettings::default()
    };
    let governor = BetFrequencyLimit::new(settings);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 10, 0).unwrap();
    for _ in 0..10 {
        governor.record_order_at(now);
    }

    assert_eq!(
        governor.manage_market_period_at(dec!(1000), dec!(1000), now),
        Duration::from_secs(600)
    );
    let next_hour = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 5).unwrap();
    assert_eq!(governor.orders_this_hour_at(next_hour), 0);
}
