pub mod analytics;
pub mod asset;
pub mod ledger;
pub mod price;
pub mod rebalance;
pub mod settings;
