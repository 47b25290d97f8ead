use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::asset::Asset;
use crate::models::rebalance::{RebalancePlan, RebalanceRow, TradeAction};

/// Weight sums further than this from 1.0 are reported in the log.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Computes target share counts and trades for a target-weight allocation.
///
/// Pure and deterministic: no I/O, rows follow the order of `assets`.
/// Target shares always round down, so the plan never spends more than the
/// portfolio is worth; the remainder is reported as `residual_cash`.
pub struct RebalanceService;

impl RebalanceService {
    pub fn new() -> Self {
        Self
    }

    /// Build a plan. Assets missing from `holdings` hold 0 shares; assets
    /// missing from `prices` (or priced ≤ 0) are unpriced and get 0 target
    /// shares whatever their weight.
    pub fn compute(
        &self,
        holdings: &HashMap<Asset, i64>,
        prices: &HashMap<Asset, f64>,
        assets: &[Asset],
    ) -> RebalancePlan {
        let price_of = |asset: &Asset| -> f64 {
            prices
                .get(asset)
                .copied()
                .filter(|p| p.is_finite() && *p > 0.0)
                .unwrap_or(0.0)
        };

        // 1. Current value per asset and in total
        let current: Vec<(i64, f64, f64)> = assets
            .iter()
            .map(|asset| {
                let shares = holdings.get(asset).copied().unwrap_or(0);
                let price = price_of(asset);
                (shares, price, shares as f64 * price)
            })
            .collect();
        let total_current_value: f64 = current.iter().map(|(_, _, value)| value).sum();

        let weight_sum: f64 = assets.iter().map(|a| a.target_weight).sum();
        if !assets.is_empty() && (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warn!(weight_sum, "target weights do not sum to 1.0; computing with weights as given");
        }

        // 2. Targets and trades
        let rows: Vec<RebalanceRow> = assets
            .iter()
            .zip(current)
            .map(|(asset, (current_shares, price, current_value))| {
                let current_weight = if total_current_value > 0.0 {
                    current_value / total_current_value
                } else {
                    0.0
                };
                let target_value = total_current_value * asset.target_weight;
                let target_shares = Self::affordable_shares(target_value, price);
                let share_delta = target_shares - current_shares;
                let after_value = target_shares as f64 * price;
                let trade_value = (share_delta as f64 * price).abs();

                RebalanceRow {
                    asset: asset.clone(),
                    price,
                    current_shares,
                    current_value,
                    current_weight,
                    target_weight: asset.target_weight,
                    target_value,
                    target_shares,
                    share_delta,
                    after_value,
                    trade_value,
                    action: TradeAction::from_delta(share_delta),
                }
            })
            .collect();

        let total_after_value: f64 = rows.iter().map(|r| r.after_value).sum();
        let residual_cash = total_current_value - total_after_value;
        debug!(total_current_value, total_after_value, residual_cash, "rebalance computed");

        RebalancePlan {
            rows,
            total_current_value,
            total_after_value,
            residual_cash,
            weight_sum,
        }
    }

    /// Whole shares purchasable with `budget` at `price`, rounded down.
    /// 0 for an unpriced asset or a non-positive budget.
    fn affordable_shares(budget: f64, price: f64) -> i64 {
        if price <= 0.0 || budget <= 0.0 {
            return 0;
        }
        let mut shares = (budget / price).floor() as i64;
        // The division can round up across an integer boundary.
        if shares as f64 * price > budget {
            shares -= 1;
        }
        shares.max(0)
    }
}

impl Default for RebalanceService {
    fn default() -> Self {
        Self::new()
    }
}
