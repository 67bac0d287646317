//! Textual rule commands.
//!
//! ```text
//! event <eventId> amountLimit=<n>
//! market <marketId> amountLimit=<n>
//! runner <marketId> <selectionId>[:<handicap>] [minBackOdds=<n>] [maxLayOdds=<n>] [backLimit=<n>] [layLimit=<n>]
//! ```
//!
//! A negative `amountLimit` clears the override.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::application::runner::RunnerRules;
use crate::application::settings::MAX_AMOUNT_LIMIT;
use crate::domain::{EventId, MarketId, RunnerId};
use crate::error::CommandError;

/// A parsed rule command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCommand {
    EventLimit {
        event_id: EventId,
        amount_limit: Option<Decimal>,
    },
    MarketLimit {
        market_id: MarketId,
        amount_limit: Option<Decimal>,
    },
    Runner {
        market_id: MarketId,
        runner_id: RunnerId,
        rules: RunnerRules,
    },
}

impl FromStr for RuleCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let verb = tokens.next().ok_or(CommandError::Empty)?;

        if verb.eq_ignore_ascii_case("event") {
            let event_id = tokens.next().ok_or(CommandError::MissingArgument("eventId"))?;
            let amount_limit = parse_amount_limit("event", tokens)?;
            Ok(Self::EventLimit {
                event_id: EventId::from(event_id),
                amount_limit,
            })
        } else if verb.eq_ignore_ascii_case("market") {
            let market_id = tokens.next().ok_or(CommandError::MissingArgument("marketId"))?;
            let amount_limit = parse_amount_limit("market", tokens)?;
            Ok(Self::MarketLimit {
                market_id: MarketId::from(market_id),
                amount_limit,
            })
        } else if verb.eq_ignore_ascii_case("runner") {
            let market_id = tokens.next().ok_or(CommandError::MissingArgument("marketId"))?;
            let runner = tokens.next().ok_or(CommandError::MissingArgument("selectionId"))?;
            let runner_id = runner
                .parse::<RunnerId>()
                .map_err(|_| CommandError::InvalidRunnerId(runner.to_string()))?;

            let mut rules = RunnerRules::default();
            for token in tokens {
                let (key, value) = split_pair(token)?;
                let value = parse_number(value)?;
                match key {
                    "minBackOdds" => rules.min_back_odds = Some(value),
                    "maxLayOdds" => rules.max_lay_odds = Some(value),
                    "backLimit" => rules.back_amount_limit = Some(check_amount(key, value)?),
                    "layLimit" => rules.lay_amount_limit = Some(check_amount(key, value)?),
                    _ => {
                        return Err(CommandError::UnknownField {
                            command: "runner",
                            field: key.to_string(),
                        })
                    }
                }
            }
            Ok(Self::Runner {
                market_id: MarketId::from(market_id),
                runner_id,
                rules,
            })
        } else {
            Err(CommandError::UnknownCommand(verb.to_string()))
        }
    }
}

fn parse_amount_limit<'a>(
    command: &'static str,
    tokens: impl Iterator<Item = &'a str>,
) -> Result<Option<Decimal>, CommandError> {
    let mut amount_limit = None;
    for token in tokens {
        let (key, value) = split_pair(token)?;
        if key != "amountLimit" {
            return Err(CommandError::UnknownField {
                command,
                field: key.to_string(),
            });
        }
        amount_limit = Some(check_amount(key, parse_number(value)?)?);
    }
    let amount_limit = amount_limit.ok_or(CommandError::MissingArgument("amountLimit"))?;
    Ok((amount_limit >= Decimal::ZERO).then_some(amount_limit))
}

fn split_pair(token: &str) -> Result<(&str, &str), CommandError> {
    token
        .split_once('=')
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .ok_or_else(|| CommandError::InvalidArgument(token.to_string()))
}

fn check_amount(field: &str, value: Decimal) -> Result<Decimal, CommandError> {
    if value > MAX_AMOUNT_LIMIT {
        return Err(CommandError::AmountOutOfRange {
            field: field.to_string(),
            value,
        });
    }
    Ok(value)
}

fn parse_number(value: &str) -> Result<Decimal, CommandError> {
    Decimal::from_str(value).map_err(|_| CommandError::InvalidNumber(value.to_string()))
}
