use serde::{Deserialize, Serialize};

use super::asset::Asset;
use super::price::ExchangeRate;

/// A position with a known average purchase price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBasisHolding {
    pub asset: Asset,
    pub shares: f64,
    /// Average price paid per share, in the asset's currency
    pub avg_price: f64,
}

impl CostBasisHolding {
    pub fn new(asset: Asset, shares: f64, avg_price: f64) -> Self {
        Self {
            asset,
            shares,
            avg_price,
        }
    }
}

/// P&L for a single priced holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingPerformance {
    pub asset: Asset,
    pub shares: f64,
    pub avg_price: f64,
    pub current_price: f64,

    /// avg_price × shares
    pub investment: f64,

    /// current_price × shares
    pub current_value: f64,

    /// current_value − investment
    pub profit_loss: f64,

    /// (current_price − avg_price) / avg_price × 100, 0 when avg_price is 0
    pub return_pct: f64,
}

/// Totals for one book of holdings denominated in a single currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    /// Book name (e.g., "Domestic ETFs")
    pub name: String,

    pub currency: String,

    /// Holdings that had a price, in input order
    pub holdings: Vec<HoldingPerformance>,

    /// Tickers excluded from the totals because no price was available
    pub unpriced: Vec<String>,

    pub total_investment: f64,
    pub total_current_value: f64,
    pub total_profit_loss: f64,

    /// (total_current_value − total_investment) / total_investment × 100
    pub total_return_pct: f64,
}

/// A segment's totals expressed in the home currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedSegment {
    pub name: String,
    pub currency: String,

    /// Units of home currency per unit of `currency`
    pub exchange_rate: f64,

    pub total_investment: f64,
    pub total_current_value: f64,
    pub total_profit_loss: f64,

    /// Unaffected by conversion
    pub total_return_pct: f64,
}

/// Whole-portfolio summary across every book, in the home currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSummary {
    pub home_currency: String,
    pub segments: Vec<ConvertedSegment>,
    pub total_investment: f64,
    pub total_current_value: f64,
    pub total_profit_loss: f64,
    pub total_return_pct: f64,
}

/// Everything one P&L refresh produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub as_of: chrono::NaiveDate,
    pub segments: Vec<SegmentSummary>,
    /// Resolved rate per foreign currency code
    pub exchange_rates: std::collections::BTreeMap<String, ExchangeRate>,
    pub combined: CombinedSummary,
}
