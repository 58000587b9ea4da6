pub mod yahoo;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::FetchError;
use crate::model::{HistoryPeriod, PriceSeries};

/// Source of daily closing prices.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn MarketData`).
pub trait MarketData: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch daily closes for `symbol` over `period`, oldest first.
    ///
    /// An unknown symbol is reported as `FetchError::NotFound`; a known symbol
    /// with no usable rows comes back as an empty series.
    fn fetch_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> BoxFuture<'_, Result<PriceSeries, Report<FetchError>>>;
}
