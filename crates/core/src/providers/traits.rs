use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::asset::Market;
use crate::models::ledger::LedgerTable;

/// Trait abstraction for market-data providers.
///
/// Each API (Yahoo Finance, Frankfurter) implements this trait. If an API
/// stops working or changes, only that one implementation is replaced.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Which markets this provider can quote.
    fn supported_markets(&self) -> Vec<Market>;

    /// Closing price of `symbol` (in `currency`) on exactly `date`.
    ///
    /// `Ok(None)` means the provider answered but has no trading data for
    /// that day (weekend, holiday). `Err` is reserved for failed calls.
    async fn get_close(
        &self,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, CoreError>;
}

/// Source of raw transaction history.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Human-readable description (for logs/errors). Must not leak secrets.
    fn name(&self) -> &str;

    /// Fetch the whole transaction table.
    async fn get_rows(&self) -> Result<LedgerTable, CoreError>;
}
