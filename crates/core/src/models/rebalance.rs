use serde::{Deserialize, Serialize};

use super::asset::Asset;
use super::price::PriceQuote;

/// What to do with one asset to reach its target weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn from_delta(share_delta: i64) -> Self {
        match share_delta {
            d if d > 0 => TradeAction::Buy,
            d if d < 0 => TradeAction::Sell,
            _ => TradeAction::Hold,
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "Buy"),
            TradeAction::Sell => write!(f, "Sell"),
            TradeAction::Hold => write!(f, "Hold"),
        }
    }
}

/// One asset's line in a rebalancing plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceRow {
    pub asset: Asset,

    /// Price used for the computation (0 when unavailable)
    pub price: f64,

    pub current_shares: i64,

    /// current_shares × price
    pub current_value: f64,

    /// current_value / total_current_value, 0 for an empty portfolio
    pub current_weight: f64,

    pub target_weight: f64,

    /// total_current_value × target_weight
    pub target_value: f64,

    /// Whole shares affordable with target_value, rounded down
    pub target_shares: i64,

    /// target_shares − current_shares (positive = buy)
    pub share_delta: i64,

    /// target_shares × price
    pub after_value: f64,

    /// |share_delta × price|
    pub trade_value: f64,

    pub action: TradeAction,
}

/// Result of a rebalancing computation. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    /// One row per registry asset, in registry order
    pub rows: Vec<RebalanceRow>,

    pub total_current_value: f64,

    /// Portfolio value after executing every trade in the plan
    pub total_after_value: f64,

    /// Cash left uninvested by whole-share rounding:
    /// total_current_value − total_after_value
    pub residual_cash: f64,

    /// Sum of the target weights the plan was computed with
    pub weight_sum: f64,
}

impl RebalancePlan {
    pub fn row(&self, ticker: &str) -> Option<&RebalanceRow> {
        self.rows.iter().find(|r| r.asset.ticker == ticker)
    }

    /// Rows that require a trade.
    pub fn trades(&self) -> impl Iterator<Item = &RebalanceRow> {
        self.rows.iter().filter(|r| r.action != TradeAction::Hold)
    }

    /// Tickers whose price was unavailable.
    pub fn unpriced(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| r.price <= 0.0)
            .map(|r| r.asset.ticker.as_str())
            .collect()
    }
}

/// Shares held of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: Asset,
    pub shares: i64,
}

/// Where the share counts of a [`HoldingsSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingsSource {
    /// Computed from the transaction ledger
    Ledger,
    /// Ledger unavailable or empty; configured fallback shares
    Fallback,
}

/// Current holdings of every registry asset, in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsSnapshot {
    pub holdings: Vec<Holding>,
    pub source: HoldingsSource,
}

impl HoldingsSnapshot {
    pub fn shares_of(&self, ticker: &str) -> Option<i64> {
        self.holdings
            .iter()
            .find(|h| h.asset.ticker == ticker)
            .map(|h| h.shares)
    }

    pub fn to_map(&self) -> std::collections::HashMap<Asset, i64> {
        self.holdings
            .iter()
            .map(|h| (h.asset.clone(), h.shares))
            .collect()
    }
}

/// Everything one rebalancing refresh produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceReport {
    pub as_of: chrono::NaiveDate,
    pub holdings_source: HoldingsSource,
    /// One quote per registry asset, in registry order
    pub quotes: Vec<PriceQuote>,
    pub plan: RebalancePlan,
}
