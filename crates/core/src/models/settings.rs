use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::CoreError;

use super::analytics::CostBasisHolding;
use super::asset::{Asset, AssetRegistry};
use super::ledger::UnknownTradePolicy;

/// User-configurable settings, loaded from a JSON file.
///
/// `Settings::default()` carries the dashboard's stock configuration: the
/// pension allocation and the domestic/US cost-basis books.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Currency every combined total is reported in (e.g., "KRW")
    pub home_currency: String,

    pub pension: PensionSettings,

    /// Where transaction history comes from. `None` leaves the ledger
    /// unconfigured; holdings then fall back to `Asset::fallback_shares`.
    #[serde(default)]
    pub ledger: Option<LedgerSettings>,

    /// Cost-basis books summarised by the P&L view
    #[serde(default)]
    pub books: Vec<BookSettings>,

    #[serde(default)]
    pub exchange_rates: ExchangeRateSettings,

    #[serde(default)]
    pub price_lookup: PriceLookupSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PensionSettings {
    /// Ledger account whose name contains this text is the pension account
    #[serde(default = "default_account_keyword")]
    pub account_keyword: String,

    #[serde(default)]
    pub unknown_trade_policy: UnknownTradePolicy,

    /// Rebalancing targets, in precedence order for ledger matching
    pub assets: Vec<Asset>,
}

fn default_account_keyword() -> String {
    "연금저축".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// CSV file path or http(s) URL of a spreadsheet CSV export
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSettings {
    pub name: String,
    pub currency: String,
    pub holdings: Vec<CostBasisHolding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateSettings {
    /// Fixed rates (home currency per unit) that bypass the FX provider
    #[serde(default)]
    pub overrides: HashMap<String, f64>,

    /// Rates used when the FX provider has nothing
    #[serde(default = "default_fallback_rates")]
    pub fallbacks: HashMap<String, f64>,
}

fn default_fallback_rates() -> HashMap<String, f64> {
    HashMap::from([("USD".to_string(), 1350.0)])
}

impl Default for ExchangeRateSettings {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            fallbacks: default_fallback_rates(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLookupSettings {
    /// Calendar days to walk back from the reference date
    #[serde(default = "default_lookback_days")]
    pub max_lookback_days: u32,

    /// Attempts per provider call before it counts as failed
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// First backoff delay; doubles on every retry
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Consecutive failed provider calls that open the circuit breaker
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,
}

fn default_lookback_days() -> u32 {
    5
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    200
}
fn default_breaker_threshold() -> u32 {
    8
}

impl Default for PriceLookupSettings {
    fn default() -> Self {
        Self {
            max_lookback_days: default_lookback_days(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            breaker_threshold: default_breaker_threshold(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        let pension_assets = vec![
            Asset::krx("360750", "미국S&P500")
                .with_target_weight(0.40)
                .with_fallback_shares(476),
            Asset::krx("132030", "골드선물")
                .with_target_weight(0.25)
                .with_fallback_shares(250),
            Asset::krx("305080", "미국채10년")
                .with_target_weight(0.10)
                .with_fallback_shares(360),
            Asset::krx("455890", "MMF")
                .with_target_weight(0.10)
                .with_match_key("머니마켓")
                .with_fallback_shares(87),
            Asset::krx("195980", "MSCI신흥국").with_target_weight(0.15),
        ];

        let domestic = BookSettings {
            name: "Domestic ETFs".to_string(),
            currency: "KRW".to_string(),
            holdings: vec![
                CostBasisHolding::new(Asset::krx("132030", "KODEX 골드선물(H)"), 250.0, 14930.0),
                CostBasisHolding::new(Asset::krx("305080", "TIGER 미국채10년선물"), 360.0, 11959.0),
                CostBasisHolding::new(Asset::krx("360750", "TIGER 미국 S&P500"), 476.0, 17945.0),
                CostBasisHolding::new(Asset::krx("455890", "RISE 머니마켓액티브"), 87.0, 52359.0),
            ],
        };

        let us = BookSettings {
            name: "US Stocks".to_string(),
            currency: "USD".to_string(),
            holdings: vec![
                CostBasisHolding::new(Asset::us("NVDA", "NVIDIA Corporation"), 6.0, 122.9667),
                CostBasisHolding::new(Asset::us("GOOG", "Alphabet Inc. (Google)"), 5.0, 167.96),
                CostBasisHolding::new(Asset::us("AVGO", "Broadcom Inc."), 4.0, 211.375),
                CostBasisHolding::new(Asset::us("OXY", "Occidental Petroleum"), 15.0, 48.57),
            ],
        };

        Self {
            home_currency: "KRW".to_string(),
            pension: PensionSettings {
                account_keyword: default_account_keyword(),
                unknown_trade_policy: UnknownTradePolicy::default(),
                assets: pension_assets,
            },
            ledger: None,
            books: vec![domestic, us],
            exchange_rates: ExchangeRateSettings::default(),
            price_lookup: PriceLookupSettings::default(),
        }
    }
}

impl Settings {
    /// Read and validate a JSON settings file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoreError::FileIO(format!("Failed to read {}: {e}", path.display())))?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings are usable. Builds the pension registry as a side check.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.home_currency.trim().is_empty() {
            return Err(CoreError::InvalidConfiguration(
                "home_currency must not be empty".into(),
            ));
        }
        if self.pension.account_keyword.is_empty() {
            return Err(CoreError::InvalidConfiguration(
                "pension.account_keyword must not be empty".into(),
            ));
        }
        self.pension_registry()?;

        if self.price_lookup.retry_attempts == 0 {
            return Err(CoreError::InvalidConfiguration(
                "price_lookup.retry_attempts must be at least 1".into(),
            ));
        }
        if self.price_lookup.breaker_threshold == 0 {
            return Err(CoreError::InvalidConfiguration(
                "price_lookup.breaker_threshold must be at least 1".into(),
            ));
        }

        let rates = self
            .exchange_rates
            .overrides
            .iter()
            .chain(self.exchange_rates.fallbacks.iter());
        for (currency, rate) in rates {
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(CoreError::InvalidConfiguration(format!(
                    "Exchange rate for {currency} must be positive, got {rate}"
                )));
            }
        }

        for book in &self.books {
            if book.name.trim().is_empty() {
                return Err(CoreError::InvalidConfiguration(
                    "Book name must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// Registry of pension assets. An asset configured without a match key
    /// is matched by its display name.
    pub fn pension_registry(&self) -> Result<AssetRegistry, CoreError> {
        let assets = self
            .pension
            .assets
            .iter()
            .cloned()
            .map(|mut asset| {
                if asset.match_key.is_empty() {
                    asset.match_key = asset.display_name.clone();
                }
                asset
            })
            .collect();
        AssetRegistry::new(assets)
    }
}
