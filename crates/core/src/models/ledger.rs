use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Raw transaction table as exported from the ledger spreadsheet.
///
/// Cells are kept as text; typing happens in [`LedgerRow::from_record`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LedgerTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Index of the column with exactly this header.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == header)
    }

    /// Cell text, or "" when the row is shorter than the header.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeType {
    Buy,
    Sell,
    /// Dividends, splits, transfers and anything else without a buy/sell marker
    Unknown,
}

impl TradeType {
    /// Classify free text. A buy marker is checked before a sell marker.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if text.contains("매수") || lower.contains("buy") {
            TradeType::Buy
        } else if text.contains("매도") || lower.contains("sell") {
            TradeType::Sell
        } else {
            TradeType::Unknown
        }
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeType::Buy => write!(f, "Buy"),
            TradeType::Sell => write!(f, "Sell"),
            TradeType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// How rows with an [`TradeType::Unknown`] trade type count toward holdings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTradePolicy {
    /// Ignore the row
    #[default]
    Exclude,
    /// Add the quantity as if it were a buy
    TreatAsBuy,
}

/// Column positions needed to read transactions out of a [`LedgerTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerColumns {
    pub name: usize,
    pub quantity: usize,
    /// Absent in exports without a buy/sell column; every row is then Unknown
    pub trade_type: Option<usize>,
}

impl LedgerColumns {
    /// Locate the asset-name, quantity and trade-type columns by header text.
    /// Returns `None` unless both the name and quantity columns are found.
    pub fn detect(table: &LedgerTable) -> Option<Self> {
        let name = find_column(&table.columns, &["종목명"])
            .or_else(|| find_column(&table.columns, &["종목"]))?;
        let quantity = find_column(&table.columns, &["수량", "주수"])?;
        let trade_type = find_column(&table.columns, &["구분"])
            .or_else(|| find_column(&table.columns, &["거래"]));
        Some(Self {
            name,
            quantity,
            trade_type,
        })
    }
}

/// First column whose header contains any of `needles`.
pub(crate) fn find_column(columns: &[String], needles: &[&str]) -> Option<usize> {
    columns
        .iter()
        .position(|c| needles.iter().any(|n| c.contains(n)))
}

/// A single typed ledger transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Free-text asset name as written in the ledger
    pub asset_name: String,

    /// Always as written; the sign comes from `trade_type`
    pub quantity: f64,

    pub trade_type: TradeType,
}

impl LedgerRow {
    pub fn new(asset_name: impl Into<String>, quantity: f64, trade_type: TradeType) -> Self {
        Self {
            asset_name: asset_name.into(),
            quantity,
            trade_type,
        }
    }

    /// Build a row from raw cells. Fails on a non-numeric quantity.
    pub fn from_record(name: &str, quantity: &str, trade_type: &str) -> Result<Self, CoreError> {
        Ok(Self {
            asset_name: name.to_string(),
            quantity: parse_quantity(quantity)?,
            trade_type: TradeType::classify(trade_type),
        })
    }

    /// Contribution of this row to the net share count under `policy`.
    pub fn signed_quantity(&self, policy: UnknownTradePolicy) -> f64 {
        match (self.trade_type, policy) {
            (TradeType::Buy, _) => self.quantity,
            (TradeType::Sell, _) => -self.quantity,
            (TradeType::Unknown, UnknownTradePolicy::TreatAsBuy) => self.quantity,
            (TradeType::Unknown, UnknownTradePolicy::Exclude) => 0.0,
        }
    }
}

/// Parse a spreadsheet quantity cell ("10", " 1,200 ", "3.5").
pub fn parse_quantity(raw: &str) -> Result<f64, CoreError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|q| q.is_finite())
        .ok_or_else(|| CoreError::Parse {
            field: "quantity".into(),
            value: raw.to_string(),
        })
}
