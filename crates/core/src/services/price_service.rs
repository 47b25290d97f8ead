use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::asset::{Asset, Market};
use crate::models::price::PriceQuote;
use crate::models::settings::PriceLookupSettings;
use crate::providers::registry::PriceProviderRegistry;
use crate::providers::traits::PriceProvider;

/// Stops calling providers once too many calls in a row have failed.
///
/// Shared by every lookup in one session, so concurrent lookups see the
/// same state.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    consecutive_failures: AtomicU32,
    open: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
            open: AtomicBool::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.threshold && !self.open.swap(true, Ordering::AcqRel) {
            warn!(failures, "price lookups disabled for this refresh: circuit breaker open");
        }
    }

    /// Close the breaker and forget past failures.
    pub fn reset(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.open.store(false, Ordering::Release);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }
}

/// Resolves "latest close at or before a date" from the provider registry.
///
/// For each day from the reference date back `max_lookback_days` days, every
/// provider for the asset's market is asked in registration order. A failed
/// call is retried with exponential backoff. Nothing found, an exhausted
/// provider, or an open breaker all produce [`PriceQuote::unavailable`].
///
/// The breaker spans one lookup session; call [`PriceService::begin_session`]
/// at the start of every refresh.
pub struct PriceService {
    registry: PriceProviderRegistry,
    settings: PriceLookupSettings,
    breaker: CircuitBreaker,
}

impl PriceService {
    pub fn new(registry: PriceProviderRegistry, settings: PriceLookupSettings) -> Self {
        let breaker = CircuitBreaker::new(settings.breaker_threshold);
        Self {
            registry,
            settings,
            breaker,
        }
    }

    /// Start a new refresh with a closed breaker.
    pub fn begin_session(&self) {
        self.breaker.reset();
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Check if at least one provider is available for a given market.
    pub fn has_provider_for(&self, market: &Market) -> bool {
        self.registry.get_provider_for(market).is_some()
    }

    /// Latest close for `asset` at or before `reference`, or the sentinel.
    pub async fn lookup(&self, asset: &Asset, reference: NaiveDate) -> PriceQuote {
        let symbol = asset.quote_symbol();
        match self
            .latest_close(&symbol, asset.currency(), &asset.market, reference)
            .await
        {
            Some((price, as_of)) => PriceQuote::new(asset.ticker.clone(), price, as_of),
            None => {
                let err = CoreError::PriceNotAvailable {
                    symbol: symbol.clone(),
                    currency: asset.currency().to_string(),
                    date: reference.to_string(),
                };
                warn!(ticker = %asset.ticker, error = %err, "no price found, using 0");
                PriceQuote::unavailable(asset.ticker.clone())
            }
        }
    }

    /// Look up every asset concurrently. All lookups complete (or degrade to
    /// the sentinel) before this returns.
    pub async fn lookup_all(&self, assets: &[Asset], reference: NaiveDate) -> HashMap<Asset, PriceQuote> {
        let quotes = join_all(assets.iter().map(|a| self.lookup(a, reference))).await;
        let found = quotes.iter().filter(|q| q.is_available()).count();
        info!(found, total = assets.len(), %reference, "price lookup finished");
        assets.iter().cloned().zip(quotes).collect()
    }

    /// Exchange rate `from` → `to` at or before `reference`, if any provider has one.
    pub async fn exchange_rate(&self, from: &str, to: &str, reference: NaiveDate) -> Option<f64> {
        self.latest_close(from, to, &Market::Fx, reference)
            .await
            .map(|(rate, _)| rate)
    }

    /// Walk back from `reference` until a provider reports a usable close.
    async fn latest_close(
        &self,
        symbol: &str,
        currency: &str,
        market: &Market,
        reference: NaiveDate,
    ) -> Option<(f64, NaiveDate)> {
        let providers = self.registry.get_providers_for(market);
        if providers.is_empty() {
            warn!(error = %CoreError::NoProvider(market.to_string()), symbol, "skipping lookup");
            return None;
        }

        for offset in 0..=self.settings.max_lookback_days {
            let date = reference - chrono::Duration::days(i64::from(offset));
            for provider in &providers {
                if self.breaker.is_open() {
                    return None;
                }
                match self.call_with_retry(*provider, symbol, currency, date).await {
                    Ok(Some(price)) if price.is_finite() && price > 0.0 => {
                        debug!(symbol, %date, price, provider = provider.name(), "close found");
                        return Some((price, date));
                    }
                    Ok(Some(price)) => {
                        debug!(symbol, %date, price, provider = provider.name(), "ignoring invalid close");
                    }
                    Ok(None) => {
                        debug!(symbol, %date, provider = provider.name(), "no trading data");
                    }
                    Err(e) => {
                        warn!(symbol, %date, provider = provider.name(), error = %e, "provider failed");
                    }
                }
            }
        }
        None
    }

    /// One provider call, retried with exponential backoff. Feeds the breaker.
    async fn call_with_retry(
        &self,
        provider: &dyn PriceProvider,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, CoreError> {
        let attempts = self.settings.retry_attempts.max(1);
        let mut delay = Duration::from_millis(self.settings.retry_base_delay_ms);
        let mut attempt = 1;
        loop {
            match provider.get_close(symbol, currency, date).await {
                Ok(close) => {
                    self.breaker.record_success();
                    return Ok(close);
                }
                Err(e) if attempt < attempts => {
                    debug!(symbol, %date, attempt, error = %e, "retrying price call");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => {
                    self.breaker.record_failure();
                    return Err(e);
                }
            }
        }
    }
}
