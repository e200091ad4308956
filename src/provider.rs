use async_trait::async_trait;

use crate::data_structures::{Interval, Period, PriceHistory, TickerInfo};
use crate::error::ProviderError;

/// A source of instrument metadata and OHLCV history.
///
/// Methods take `&mut self` so implementations can keep rate-limit state.
#[async_trait]
pub trait MarketDataProvider: Send {
    fn name(&self) -> &'static str;

    async fn ticker_info(&mut self, symbol: &str) -> Result<TickerInfo, ProviderError>;

    async fn history(
        &mut self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceHistory, ProviderError>;
}
