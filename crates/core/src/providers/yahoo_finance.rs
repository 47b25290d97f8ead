use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use time::OffsetDateTime;

use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::asset::Market;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance API provider for exchange-listed prices.
///
/// - **Free**: No API key required.
/// - **Coverage**: KRX ETFs (`360750.KS`) and US equities (`NVDA`).
/// - **Data**: Daily OHLCV history; only the close is used.
///
/// Prices come back in the listing's native currency, so the `currency`
/// argument is ignored.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Midnight UTC at the start of `date`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let invalid = |e: &dyn std::fmt::Display| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid date {date}: {e}"),
        };
        let month = time::Month::try_from(date.month() as u8).map_err(|e| invalid(&e))?;
        let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| invalid(&e))?;
        Ok(day.midnight().assume_utc())
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_markets(&self) -> Vec<Market> {
        vec![Market::Krx, Market::Us]
    }

    async fn get_close(
        &self,
        symbol: &str,
        _currency: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, CoreError> {
        let start = Self::to_offset_datetime(date)?;
        let end = Self::to_offset_datetime(date + chrono::Duration::days(1))?;

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {symbol} on {date}: {e}"),
            })?;

        // An answered request without quotes is a non-trading day.
        let Ok(quotes) = resp.quotes() else {
            return Ok(None);
        };

        let close = quotes
            .iter()
            .filter(|q| Self::timestamp_to_naive_date(q.timestamp) == Some(date))
            .last()
            .map(|q| q.close);

        Ok(close)
    }
}
