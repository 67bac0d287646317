//! Live market cache port.

use std::sync::Arc;

use crate::domain::{MarketBook, MarketId, MarketOrders};

/// Read access to the live market and order cache.
///
/// The cache is owned and mutated by the streaming layer; the limit engine
/// only reads snapshots from it. Implementations must be cheap to call from
/// many management threads at once.
pub trait MarketCache: Send + Sync {
    /// Latest price snapshot of a market.
    fn market(&self, market_id: &MarketId) -> Option<Arc<MarketBook>>;

    /// Latest state of the account's orders on a market.
    fn orders(&self, market_id: &MarketId) -> Option<Arc<MarketOrders>>;
}
