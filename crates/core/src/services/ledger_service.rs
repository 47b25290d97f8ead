use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::models::asset::{Asset, AssetRegistry};
use crate::models::ledger::{find_column, LedgerColumns, LedgerRow, LedgerTable, UnknownTradePolicy};
use crate::providers::traits::LedgerSource;

/// Header fragments that identify the account column, in priority order.
const ACCOUNT_COLUMN_HINTS: [&str; 5] = ["계좌", "증권사", "Account", "account", "자산"];

/// Derives share counts from raw transaction history.
///
/// Pure logic apart from [`LedgerService::pension_holdings`], which wraps a
/// [`LedgerSource`] call and degrades every failure to an empty mapping.
pub struct LedgerService {
    registry: AssetRegistry,
    policy: UnknownTradePolicy,
}

impl LedgerService {
    pub fn new(registry: AssetRegistry, policy: UnknownTradePolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn policy(&self) -> UnknownTradePolicy {
        self.policy
    }

    /// Net shares held for one match key: rows whose name contains `match_key`
    /// are summed with their trade-type sign, then truncated toward zero.
    /// No matching rows means 0.
    pub fn net_shares(&self, rows: &[LedgerRow], match_key: &str) -> i64 {
        let total: f64 = rows
            .iter()
            .filter(|row| row.asset_name.contains(match_key))
            .map(|row| row.signed_quantity(self.policy))
            .sum();
        total.trunc() as i64
    }

    /// Net shares for every registry asset.
    ///
    /// Each row counts toward at most one asset: the first in registry order
    /// whose match key it contains. Every asset is present in the result.
    pub fn holdings(&self, rows: &[LedgerRow]) -> HashMap<Asset, i64> {
        let mut totals: HashMap<&Asset, f64> = self
            .registry
            .assets()
            .iter()
            .map(|asset| (asset, 0.0))
            .collect();

        for row in rows {
            let mut candidates = self.registry.matches(&row.asset_name);
            let Some(asset) = candidates.next() else {
                continue;
            };
            let others: Vec<&str> = candidates.map(|a| a.ticker.as_str()).collect();
            if !others.is_empty() {
                warn!(
                    name = %row.asset_name,
                    chosen = %asset.ticker,
                    ?others,
                    "ledger row matches several assets, using the first"
                );
            }
            if let Some(total) = totals.get_mut(asset) {
                *total += row.signed_quantity(self.policy);
            }
        }

        totals
            .into_iter()
            .map(|(asset, total)| (asset.clone(), total.trunc() as i64))
            .collect()
    }

    /// Distinct account identifiers and the header of the column holding them.
    /// Values keep their first-seen order. `(vec![], None)` if no column qualifies.
    pub fn account_names(table: &LedgerTable) -> (Vec<String>, Option<String>) {
        let Some(col) = find_column(&table.columns, &ACCOUNT_COLUMN_HINTS) else {
            return (Vec::new(), None);
        };
        let mut accounts: Vec<String> = Vec::new();
        for row in 0..table.len() {
            let value = table.cell(row, col);
            if !accounts.iter().any(|a| a == value) {
                accounts.push(value.to_string());
            }
        }
        (accounts, Some(table.columns[col].clone()))
    }

    /// Rows of `table` whose `column` cell equals `account`.
    /// An unknown column yields an empty table with the same header.
    pub fn filter_by_account(table: &LedgerTable, column: &str, account: &str) -> LedgerTable {
        let rows = match table.column_index(column) {
            Some(col) => table
                .rows
                .iter()
                .filter(|row| row.get(col).map(String::as_str) == Some(account))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        LedgerTable::new(table.columns.clone(), rows)
    }

    /// Type every record of `table`. Records with a non-numeric quantity are
    /// logged and skipped.
    pub fn typed_rows(table: &LedgerTable, columns: LedgerColumns) -> Vec<LedgerRow> {
        (0..table.len())
            .filter_map(|i| {
                let name = table.cell(i, columns.name);
                let quantity = table.cell(i, columns.quantity);
                let trade_type = columns.trade_type.map(|c| table.cell(i, c)).unwrap_or("");
                match LedgerRow::from_record(name, quantity, trade_type) {
                    Ok(row) => {
                        debug!(?row, "parsed ledger row");
                        Some(row)
                    }
                    Err(e) => {
                        debug!(row = i, name, error = %e, "skipping ledger row");
                        None
                    }
                }
            })
            .collect()
    }

    /// First account whose name contains `keyword`, with the account column header.
    pub fn find_account(table: &LedgerTable, keyword: &str) -> Option<(String, String)> {
        let (accounts, column) = Self::account_names(table);
        let column = column?;
        accounts
            .into_iter()
            .find(|a| a.contains(keyword))
            .map(|account| (account, column))
    }

    /// Holdings of the account matching `keyword`, computed from `table`.
    /// Returns an empty mapping when the table lacks what is needed.
    pub fn account_holdings(&self, table: &LedgerTable, keyword: &str) -> HashMap<Asset, i64> {
        if table.is_empty() {
            warn!("ledger is empty");
            return HashMap::new();
        }
        let Some((account, column)) = Self::find_account(table, keyword) else {
            warn!(keyword, "no ledger account matches keyword");
            return HashMap::new();
        };
        let account_rows = Self::filter_by_account(table, &column, &account);
        let Some(columns) = LedgerColumns::detect(&account_rows) else {
            warn!(columns = ?table.columns, "ledger lacks asset name or quantity column");
            return HashMap::new();
        };
        let rows = Self::typed_rows(&account_rows, columns);
        info!(%account, rows = rows.len(), "computed holdings from ledger");
        self.holdings(&rows)
    }

    /// Fetch the ledger and compute holdings for the account matching
    /// `keyword`. Never fails: an unreachable source yields an empty mapping.
    pub async fn pension_holdings(
        &self,
        source: &dyn LedgerSource,
        keyword: &str,
    ) -> HashMap<Asset, i64> {
        match source.get_rows().await {
            Ok(table) => self.account_holdings(&table, keyword),
            Err(e) => {
                warn!(source = source.name(), error = %e, "ledger unavailable");
                HashMap::new()
            }
        }
    }
}
