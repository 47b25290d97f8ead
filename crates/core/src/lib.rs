pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use chrono::NaiveDate;
use models::{
    analytics::SummaryReport,
    asset::{Asset, AssetRegistry, Market},
    ledger::LedgerTable,
    price::RateSource,
    rebalance::{Holding, HoldingsSnapshot, HoldingsSource, RebalanceReport},
    settings::Settings,
};
use providers::{
    registry::PriceProviderRegistry, sheet_ledger::CsvLedgerSource, traits::LedgerSource,
};
use services::{
    analytics_service::AnalyticsService, currency_service::CurrencyService,
    ledger_service::LedgerService, price_service::PriceService,
    rebalance_service::RebalanceService,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use errors::CoreError;

/// Main entry point for the Holdings Dashboard core library.
///
/// Holds the configuration and every service a refresh needs. Each call
/// recomputes from fresh ledger and price data; nothing is cached between
/// refreshes.
#[must_use]
pub struct HoldingsDashboard {
    settings: Settings,
    ledger: Option<Box<dyn LedgerSource>>,
    ledger_service: LedgerService,
    price_service: PriceService,
    currency_service: CurrencyService,
    rebalance_service: RebalanceService,
    analytics_service: AnalyticsService,
    startup_warnings: Vec<CoreError>,
}

impl std::fmt::Debug for HoldingsDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoldingsDashboard")
            .field("home_currency", &self.settings.home_currency)
            .field("pension_assets", &self.ledger_service.registry().len())
            .field("books", &self.settings.books.len())
            .field("ledger", &self.ledger.as_ref().map(|l| l.name()))
            .finish()
    }
}

impl HoldingsDashboard {
    /// Wire a dashboard from explicit collaborators.
    ///
    /// A missing ledger is not an error: it is logged once, kept in
    /// [`startup_warnings`](Self::startup_warnings), and holdings fall back to
    /// the configured share counts.
    pub fn new(
        settings: Settings,
        registry: PriceProviderRegistry,
        ledger: Option<Box<dyn LedgerSource>>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let assets = settings.pension_registry()?;

        let mut startup_warnings = Vec::new();
        if ledger.is_none() {
            let err = CoreError::ConfigurationMissing(
                "no ledger source configured; using fallback share counts".into(),
            );
            warn!(error = %err, "starting without transaction history");
            startup_warnings.push(err);
        }

        Ok(Self {
            ledger_service: LedgerService::new(assets, settings.pension.unknown_trade_policy),
            price_service: PriceService::new(registry, settings.price_lookup.clone()),
            currency_service: CurrencyService::new(settings.exchange_rates.clone()),
            rebalance_service: RebalanceService::new(),
            analytics_service: AnalyticsService::new(),
            ledger,
            settings,
            startup_warnings,
        })
    }

    /// Build with the default market-data providers and, if configured, the
    /// spreadsheet ledger named in the settings.
    pub fn from_settings(settings: Settings) -> Result<Self, CoreError> {
        let ledger = settings
            .ledger
            .as_ref()
            .map(|l| Box::new(CsvLedgerSource::from_location(&l.location)) as Box<dyn LedgerSource>);
        Self::new(settings, PriceProviderRegistry::new_with_defaults(), ledger)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn pension_assets(&self) -> &AssetRegistry {
        self.ledger_service.registry()
    }

    /// Problems found at construction that did not stop the dashboard.
    #[must_use]
    pub fn startup_warnings(&self) -> &[CoreError] {
        &self.startup_warnings
    }

    /// Pin the exchange rate for `currency` instead of asking the FX provider.
    pub fn set_exchange_rate(&mut self, currency: &str, rate: f64) -> Result<(), CoreError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Exchange rate for {currency} must be positive, got {rate}"
            )));
        }
        self.currency_service.set_override(currency, rate);
        Ok(())
    }

    // ── Ledger ──────────────────────────────────────────────────────

    /// Full transaction table, or an empty one if the ledger is missing or
    /// unreachable.
    pub async fn ledger_table(&self) -> LedgerTable {
        let Some(ledger) = &self.ledger else {
            return LedgerTable::default();
        };
        match ledger.get_rows().await {
            Ok(table) => table,
            Err(e) => {
                warn!(source = ledger.name(), error = %e, "ledger unavailable");
                LedgerTable::default()
            }
        }
    }

    /// Distinct account names in the ledger and the column they came from.
    pub async fn accounts(&self) -> (Vec<String>, Option<String>) {
        LedgerService::account_names(&self.ledger_table().await)
    }

    /// Transactions of the first account whose name contains `keyword`.
    /// Empty when no account matches.
    pub async fn account_ledger(&self, keyword: &str) -> LedgerTable {
        let table = self.ledger_table().await;
        match LedgerService::find_account(&table, keyword) {
            Some((account, column)) => LedgerService::filter_by_account(&table, &column, &account),
            None => LedgerTable::new(table.columns, Vec::new()),
        }
    }

    /// Current pension holdings: from the ledger when it yields anything,
    /// otherwise the configured fallback share counts.
    pub async fn pension_holdings(&self) -> HoldingsSnapshot {
        let from_ledger = match &self.ledger {
            Some(ledger) => {
                self.ledger_service
                    .pension_holdings(ledger.as_ref(), &self.settings.pension.account_keyword)
                    .await
            }
            None => HashMap::new(),
        };

        let source = if from_ledger.is_empty() {
            HoldingsSource::Fallback
        } else {
            HoldingsSource::Ledger
        };

        let holdings = self
            .pension_assets()
            .assets()
            .iter()
            .map(|asset| Holding {
                asset: asset.clone(),
                shares: match source {
                    HoldingsSource::Ledger => from_ledger.get(asset).copied().unwrap_or(0),
                    HoldingsSource::Fallback => asset.fallback_shares,
                },
            })
            .collect();

        HoldingsSnapshot { holdings, source }
    }

    // ── Refreshes ───────────────────────────────────────────────────

    /// Run the rebalancing pipeline as of `date`.
    ///
    /// `overrides` replaces the share count of individual tickers, the way a
    /// user corrects a holding by hand; unknown tickers are ignored.
    pub async fn rebalance(
        &self,
        date: NaiveDate,
        overrides: &HashMap<String, i64>,
    ) -> RebalanceReport {
        let snapshot = self.pension_holdings().await;
        let mut holdings = snapshot.to_map();
        for (ticker, &shares) in overrides {
            match self.pension_assets().get(ticker) {
                Some(asset) => {
                    holdings.insert(asset.clone(), shares);
                }
                None => warn!(%ticker, "ignoring share override for unknown ticker"),
            }
        }

        let assets = self.pension_assets().assets();
        self.price_service.begin_session();
        let quotes = self.price_service.lookup_all(assets, date).await;
        let prices: HashMap<Asset, f64> = quotes
            .iter()
            .map(|(asset, quote)| (asset.clone(), quote.price))
            .collect();

        let plan = self.rebalance_service.compute(&holdings, &prices, assets);
        info!(
            total = plan.total_current_value,
            residual = plan.residual_cash,
            "rebalance refresh complete"
        );

        let ordered_quotes = assets
            .iter()
            .filter_map(|asset| quotes.get(asset).cloned())
            .collect();

        RebalanceReport {
            as_of: date,
            holdings_source: snapshot.source,
            quotes: ordered_quotes,
            plan,
        }
    }

    /// P&L of every configured book, converted into the home currency.
    ///
    /// Fails only when a foreign book's currency has no rate from any source
    /// (no override, no provider answer, no fallback).
    pub async fn portfolio_summary(&self, date: NaiveDate) -> Result<SummaryReport, CoreError> {
        let mut assets: Vec<Asset> = Vec::new();
        for book in &self.settings.books {
            for holding in &book.holdings {
                if !assets.contains(&holding.asset) {
                    assets.push(holding.asset.clone());
                }
            }
        }

        self.price_service.begin_session();
        let prices: HashMap<Asset, f64> = self
            .price_service
            .lookup_all(&assets, date)
            .await
            .into_iter()
            .map(|(asset, quote)| (asset, quote.price))
            .collect();

        let segments: Vec<_> = self
            .settings
            .books
            .iter()
            .map(|book| {
                self.analytics_service
                    .segment_summary(&book.name, &book.currency, &book.holdings, &prices)
            })
            .collect();

        let home = self.settings.home_currency.to_uppercase();
        let mut exchange_rates = BTreeMap::new();
        for segment in &segments {
            if segment.currency == home || exchange_rates.contains_key(&segment.currency) {
                continue;
            }
            let rate = self
                .currency_service
                .resolve(&self.price_service, &segment.currency, &home, date)
                .await;
            exchange_rates.insert(segment.currency.clone(), rate);
        }

        let rates: HashMap<String, f64> = exchange_rates
            .iter()
            .filter(|(_, r)| r.source != RateSource::Unavailable)
            .map(|(currency, r)| (currency.clone(), r.rate))
            .collect();
        let combined = self.analytics_service.combine(&segments, &home, &rates)?;

        Ok(SummaryReport {
            as_of: date,
            segments,
            exchange_rates,
            combined,
        })
    }

    /// True if at least one provider can quote `market`.
    #[must_use]
    pub fn has_provider_for(&self, market: Market) -> bool {
        self.price_service.has_provider_for(&market)
    }
}
