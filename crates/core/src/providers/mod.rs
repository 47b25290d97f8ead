pub mod registry;
pub mod traits;

// Market data
pub mod frankfurter;
pub mod yahoo_finance;

// Transaction history
pub mod sheet_ledger;
