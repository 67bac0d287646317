//! Account-level budget.

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::replication::{FundsState, ReplicationCommand, ReplicationTx, Replicator};

/// Snapshot of the account's funds; the ceiling for all allocation.
///
/// Every effective change is published as a replication command. The reserve
/// is money never handed out to markets and only ever grows.
pub struct ExistingFunds {
    state: Mutex<FundsState>,
    minimum_reserve: Decimal,
    replicator: Arc<Replicator>,
}

impl ExistingFunds {
    #[must_use]
    pub fn new(replicator: Arc<Replicator>, minimum_reserve: Decimal, currency_rate: Decimal) -> Self {
        let minimum_reserve = minimum_reserve.max(Decimal::ZERO);
        Self {
            state: Mutex::new(FundsState {
                reserve: minimum_reserve,
                currency_rate,
                ..FundsState::default()
            }),
            minimum_reserve,
            replicator,
        }
    }

    /// Commit log shared with the registry.
    #[must_use]
    pub const fn replicator(&self) -> &Arc<Replicator> {
        &self.replicator
    }

    /// Current funds.
    #[must_use]
    pub fn state(&self) -> FundsState {
        *self.state.lock()
    }

    #[must_use]
    pub fn reserve(&self) -> Decimal {
        self.state.lock().reserve
    }

    #[must_use]
    pub fn currency_rate(&self) -> Decimal {
        self.state.lock().currency_rate
    }

    /// Budget available to markets: available funds minus exposure minus
    /// reserve, never negative.
    #[must_use]
    pub fn total_limit(&self) -> Decimal {
        let state = self.state.lock();
        (state.available_funds - state.exposure - state.reserve).max(Decimal::ZERO)
    }

    /// Exchange minimum stake expressed in account currency.
    #[must_use]
    pub fn min_order_size(&self, base_min_order_size: Decimal) -> Decimal {
        base_min_order_size * self.currency_rate()
    }

    /// Raise the reserve. Decreases are rejected.
    pub fn set_reserve(&self, reserve: Decimal) -> bool {
        let mut tx = self.replicator.begin();
        let mut state = self.state.lock();
        Self::apply_reserve(&mut tx, &mut state, reserve)
    }

    pub fn set_available_funds(&self, available_funds: Decimal) -> bool {
        let mut tx = self.replicator.begin();
        let mut state = self.state.lock();
        Self::apply_available(&mut tx, &mut state, available_funds)
    }

    /// Set the current exposure. Exchanges report exposure as a negative
    /// balance; it is stored as a positive liability.
    pub fn set_exposure(&self, exposure: Decimal) -> bool {
        let mut tx = self.replicator.begin();
        let mut state = self.state.lock();
        Self::apply_exposure(&mut tx, &mut state, exposure)
    }

    pub fn set_currency_rate(&self, currency_rate: Decimal) -> bool {
        if currency_rate <= Decimal::ZERO {
            warn!(%currency_rate, "Ignoring non-positive currency rate");
            return false;
        }
        let mut tx = self.replicator.begin();
        let mut state = self.state.lock();
        if state.currency_rate == currency_rate {
            return false;
        }
        state.currency_rate = currency_rate;
        tx.publish(ReplicationCommand::SetCurrencyRate(currency_rate));
        debug!(%currency_rate, "Currency rate updated");
        true
    }

    /// Apply an account report in one commit, topping the reserve up to the
    /// configured minimum.
    pub fn update_account(&self, available_funds: Decimal, exposure: Decimal) -> bool {
        let mut tx = self.replicator.begin();
        let mut state = self.state.lock();
        let available = Self::apply_available(&mut tx, &mut state, available_funds);
        let exposure = Self::apply_exposure(&mut tx, &mut state, exposure);
        let reserve = state.reserve < self.minimum_reserve
            && Self::apply_reserve(&mut tx, &mut state, self.minimum_reserve);
        available || exposure || reserve
    }

    fn apply_reserve(tx: &mut ReplicationTx<'_>, state: &mut FundsState, reserve: Decimal) -> bool {
        if reserve == state.reserve {
            return false;
        }
        if reserve < state.reserve {
            warn!(
                current = %state.reserve,
                requested = %reserve,
                "Rejecting reserve decrease"
            );
            return false;
        }
        state.reserve = reserve;
        tx.publish(ReplicationCommand::SetReserve(reserve));
        info!(%reserve, "Reserve raised");
        true
    }

    fn apply_available(
        tx: &mut ReplicationTx<'_>,
        state: &mut FundsState,
        available_funds: Decimal,
    ) -> bool {
        if state.available_funds == available_funds {
            return false;
        }
        state.available_funds = available_funds;
        tx.publish(ReplicationCommand::SetAvailableFunds(available_funds));
        true
    }

    fn apply_exposure(tx: &mut ReplicationTx<'_>, state: &mut FundsState, exposure: Decimal) -> bool {
        let exposure = exposure.abs();
        if state.exposure == exposure {
            return false;
        }
        state.exposure = exposure;
        tx.publish(ReplicationCommand::SetExposure(exposure));
        true
    }
}
