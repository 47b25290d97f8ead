use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::analytics::{
    CombinedSummary, ConvertedSegment, CostBasisHolding, HoldingPerformance, SegmentSummary,
};
use crate::models::asset::Asset;

/// Computes P&L for cost-basis books and folds them into one home-currency
/// summary.
///
/// Pure arithmetic; prices and exchange rates are supplied by the caller.
/// Every percentage is zero-guarded against a zero denominator.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Summarise one book denominated in `currency`.
    ///
    /// Holdings without a positive price are left out of every total and
    /// listed in `unpriced`.
    pub fn segment_summary(
        &self,
        name: &str,
        currency: &str,
        holdings: &[CostBasisHolding],
        prices: &HashMap<Asset, f64>,
    ) -> SegmentSummary {
        let mut performances = Vec::new();
        let mut unpriced = Vec::new();

        for holding in holdings {
            let price = prices.get(&holding.asset).copied().unwrap_or(0.0);
            if !price.is_finite() || price <= 0.0 {
                unpriced.push(holding.asset.ticker.clone());
                continue;
            }
            let investment = holding.avg_price * holding.shares;
            let current_value = price * holding.shares;
            performances.push(HoldingPerformance {
                asset: holding.asset.clone(),
                shares: holding.shares,
                avg_price: holding.avg_price,
                current_price: price,
                investment,
                current_value,
                profit_loss: current_value - investment,
                return_pct: percent(price - holding.avg_price, holding.avg_price),
            });
        }

        let total_investment: f64 = performances.iter().map(|p| p.investment).sum();
        let total_current_value: f64 = performances.iter().map(|p| p.current_value).sum();
        let total_profit_loss = total_current_value - total_investment;

        SegmentSummary {
            name: name.to_string(),
            currency: currency.to_uppercase(),
            holdings: performances,
            unpriced,
            total_investment,
            total_current_value,
            total_profit_loss,
            total_return_pct: percent(total_profit_loss, total_investment),
        }
    }

    /// Convert every segment into `home_currency` and total them.
    ///
    /// `rates` maps a foreign currency code to units of home currency per
    /// unit. Home-currency segments use 1.0. A foreign segment without a
    /// rate is an error.
    pub fn combine(
        &self,
        segments: &[SegmentSummary],
        home_currency: &str,
        rates: &HashMap<String, f64>,
    ) -> Result<CombinedSummary, CoreError> {
        let home = home_currency.to_uppercase();
        let mut converted = Vec::with_capacity(segments.len());

        for segment in segments {
            let rate = if segment.currency == home {
                1.0
            } else {
                rates
                    .get(&segment.currency)
                    .copied()
                    .filter(|r| r.is_finite() && *r > 0.0)
                    .ok_or_else(|| CoreError::MissingExchangeRate {
                        from: segment.currency.clone(),
                        to: home.clone(),
                    })?
            };
            converted.push(ConvertedSegment {
                name: segment.name.clone(),
                currency: segment.currency.clone(),
                exchange_rate: rate,
                total_investment: segment.total_investment * rate,
                total_current_value: segment.total_current_value * rate,
                total_profit_loss: segment.total_profit_loss * rate,
                total_return_pct: segment.total_return_pct,
            });
        }

        let total_investment: f64 = converted.iter().map(|s| s.total_investment).sum();
        let total_current_value: f64 = converted.iter().map(|s| s.total_current_value).sum();
        let total_profit_loss: f64 = converted.iter().map(|s| s.total_profit_loss).sum();

        Ok(CombinedSummary {
            home_currency: home,
            segments: converted,
            total_investment,
            total_current_value,
            total_profit_loss,
            total_return_pct: percent(total_profit_loss, total_investment),
        })
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

/// `part / whole × 100`, or 0 when `whole` is not positive.
fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
