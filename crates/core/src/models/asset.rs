use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::CoreError;

/// The market an asset is quoted on.
/// Determines the quote symbol and which price provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    /// Korea Exchange listings (ETFs such as 360750), quoted in KRW
    Krx,
    /// US equities (NVDA, GOOG, ...), quoted in USD
    Us,
    /// Fiat currency pairs, quoted by the Frankfurter API
    Fx,
}

impl Market {
    /// Currency the market quotes prices in.
    pub fn currency(&self) -> &'static str {
        match self {
            Market::Krx => "KRW",
            Market::Us => "USD",
            Market::Fx => "",
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::Krx => write!(f, "KRX"),
            Market::Us => write!(f, "US"),
            Market::Fx => write!(f, "FX"),
        }
    }
}

/// A tradable asset tracked by the dashboard.
///
/// **Equality and hashing** are based solely on `(ticker, market)`.
/// Display name, weight and match key are configuration and do not
/// change the identity of the asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Exchange ticker (e.g., "360750", "NVDA")
    pub ticker: String,

    /// Human-readable name (e.g., "미국S&P500")
    pub display_name: String,

    pub market: Market,

    /// Fraction of the rebalanced portfolio this asset should hold, in [0, 1]
    #[serde(default)]
    pub target_weight: f64,

    /// Substring searched for in the ledger's free-text asset name column
    #[serde(default)]
    pub match_key: String,

    /// Manually entered share count, used only when the ledger yields nothing
    #[serde(default)]
    pub fallback_shares: i64,
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.ticker == other.ticker && self.market == other.market
    }
}

impl Eq for Asset {}

impl std::hash::Hash for Asset {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ticker.hash(state);
        self.market.hash(state);
    }
}

impl Asset {
    pub fn new(ticker: impl Into<String>, display_name: impl Into<String>, market: Market) -> Self {
        let display_name = display_name.into();
        Self {
            ticker: ticker.into().to_uppercase(),
            match_key: display_name.clone(),
            display_name,
            market,
            target_weight: 0.0,
            fallback_shares: 0,
        }
    }

    pub fn krx(ticker: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(ticker, display_name, Market::Krx)
    }

    pub fn us(ticker: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(ticker, display_name, Market::Us)
    }

    pub fn with_target_weight(mut self, weight: f64) -> Self {
        self.target_weight = weight;
        self
    }

    pub fn with_match_key(mut self, key: impl Into<String>) -> Self {
        self.match_key = key.into();
        self
    }

    pub fn with_fallback_shares(mut self, shares: i64) -> Self {
        self.fallback_shares = shares;
        self
    }

    /// Symbol understood by the market-data provider.
    /// KRX listings carry Yahoo's `.KS` suffix.
    pub fn quote_symbol(&self) -> String {
        match self.market {
            Market::Krx => format!("{}.KS", self.ticker),
            Market::Us | Market::Fx => self.ticker.clone(),
        }
    }

    pub fn currency(&self) -> &'static str {
        self.market.currency()
    }
}

/// Ordered, validated set of rebalancing assets.
///
/// Registry order is significant: ledger rows resolve to the first asset
/// whose match key they contain, and plans list rows in this order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetRegistry {
    assets: Vec<Asset>,
}

impl AssetRegistry {
    pub fn new(assets: Vec<Asset>) -> Result<Self, CoreError> {
        let mut tickers = HashSet::new();
        let mut keys = HashSet::new();
        for asset in &assets {
            if !tickers.insert((asset.ticker.as_str(), asset.market)) {
                return Err(CoreError::ValidationError(format!(
                    "Duplicate asset ticker {}",
                    asset.ticker
                )));
            }
            if asset.match_key.is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "Asset {} has an empty match key",
                    asset.ticker
                )));
            }
            if !keys.insert(asset.match_key.as_str()) {
                return Err(CoreError::ValidationError(format!(
                    "Match key '{}' is used by more than one asset",
                    asset.match_key
                )));
            }
            if !asset.target_weight.is_finite() || !(0.0..=1.0).contains(&asset.target_weight) {
                return Err(CoreError::ValidationError(format!(
                    "Target weight {} for {} must be within [0, 1]",
                    asset.target_weight, asset.ticker
                )));
            }
        }
        Ok(Self { assets })
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<&Asset> {
        let upper = ticker.to_uppercase();
        self.assets.iter().find(|a| a.ticker == upper)
    }

    /// Sum of all target weights. Expected to be 1.0, not enforced.
    pub fn weight_sum(&self) -> f64 {
        self.assets.iter().map(|a| a.target_weight).sum()
    }

    /// First asset (in registry order) whose match key occurs in `name`.
    pub fn resolve(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| name.contains(a.match_key.as_str()))
    }

    /// All assets whose match key occurs in `name`. More than one means the
    /// row is ambiguous.
    pub fn matches<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Asset> + 'a {
        self.assets
            .iter()
            .filter(move |a| name.contains(a.match_key.as_str()))
    }
}
