use std::io::Write;
use std::time::Duration;

use limitkeeper::application::{FrequencySettings, LimitSettings, SchedulerSettings};
use limitkeeper::error::{ConfigError, Error};
use limitkeeper::infrastructure::config::settings::Config;
use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

#[test]
fn loads_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        commands = ["market 1.5 amountLimit=20"]

        [limits]
        calculated_limit_max_age_secs = 120
        remove_exposure_before_start_secs = 1800

        [frequency]
        orders_per_hour = 2000
        max_period_secs = 300

        [scheduler]
        workers = 3
        limits_period_secs = 30
        dispatch_interval_ms = 50

        [replication]
        queue_capacity = 64
        "#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.commands, vec!["market 1.5 amountLimit=20".to_string()]);
    assert_eq!(config.replication.queue_capacity, 64);

    let limits = LimitSettings::from(config.limits.clone());
    assert_eq!(limits.calculated_limit_max_age, Duration::from_secs(120));
    assert_eq!(limits.remove_exposure_before_start, Duration::from_secs(1800));
    assert_eq!(limits.deadband_absolute, dec!(2));

    let frequency = FrequencySettings::from(config.frequency.clone());
    assert_eq!(frequency.orders_per_hour, 2000);
    assert_eq!(frequency.min_period, Duration::from_secs(1));
    assert_eq!(frequency.max_period, Duration::from_secs(300));

    let scheduler = SchedulerSettings::from(config.scheduler.clone());
    assert_eq!(scheduler.workers, 3);
    assert_eq!(scheduler.limits_period, Duration::from_secs(30));
    assert_eq!(scheduler.dispatch_interval, Duration::from_millis(50));
}

#[test]
fn defaults_match_runtime_settings() {
    let config = Config::parse_toml("").unwrap();
    assert_eq!(LimitSettings::from(config.limits), LimitSettings::default());
    assert_eq!(FrequencySettings::from(config.frequency), FrequencySettings::default());
}

#[test]
fn missing_file_is_a_read_error() {
    let err = Config::load("/nonexistent/limitkeeper.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn rejects_zero_workers() {
    let err = Config::parse_toml("[scheduler]\nworkers = 0\n").unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue { field: "workers", .. })
    ));
}

#[test]
fn rejects_relative_deadband_of_one() {
    assert!(Config::parse_toml("[limits]\ndeadband_relative = 1\n").is_err());
}
