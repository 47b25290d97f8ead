use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use directories::ProjectDirs;
use holdings_dashboard_core::models::settings::{LedgerSettings, Settings};
use holdings_dashboard_core::HoldingsDashboard;
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{Cli, Command};

mod cli;
mod render;

fn init_tracing() {
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "holdings", "holdings-dashboard")
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// An explicit `--config` must exist; the per-user default is optional.
fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(path) = explicit {
        return Settings::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()));
    }
    match default_settings_path() {
        Some(path) if path.exists() => Settings::load_from_file(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        other => {
            debug!(path = ?other, "no settings file, using built-in defaults");
            Ok(Settings::default())
        }
    }
}

async fn refresh(dashboard: &HoldingsDashboard, opts: &Cli, date: NaiveDate) -> anyhow::Result<()> {
    match &opts.command {
        Command::Rebalance { shares } => {
            let overrides: HashMap<String, i64> = shares.iter().cloned().collect();
            let report = dashboard.rebalance(date, &overrides).await;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render::rebalance(&report));
            }
        }
        Command::Summary { .. } => {
            let report = dashboard.portfolio_summary(date).await?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render::summary(&report));
            }
        }
        Command::Accounts => {
            let (accounts, column) = dashboard.accounts().await;
            if opts.json {
                println!(
                    "{}",
                    serde_json::json!({ "column": column, "accounts": accounts })
                );
            } else {
                println!("{}", render::accounts(&accounts, column.as_deref()));
            }
        }
        Command::Ledger { account } => {
            let keyword = account
                .as_deref()
                .unwrap_or(&dashboard.settings().pension.account_keyword);
            let table = dashboard.account_ledger(keyword).await;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                println!("{}", render::ledger(&table));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let opts = Cli::parse();

    let mut settings = load_settings(opts.config.as_deref())?;
    if let Some(location) = &opts.ledger {
        settings.ledger = Some(LedgerSettings {
            location: location.clone(),
        });
    }

    let mut dashboard = HoldingsDashboard::from_settings(settings)?;
    if let Command::Summary { exchange_rate } = &opts.command {
        for (currency, rate) in exchange_rate {
            dashboard.set_exchange_rate(currency, *rate)?;
        }
    }
    for warning in dashboard.startup_warnings() {
        eprintln!("warning: {warning}");
    }

    loop {
        let date = opts
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let result = refresh(&dashboard, &opts, date).await;
        let secs = match next_tick(result, opts.watch) {
            ControlFlow::Continue(secs) => secs,
            ControlFlow::Break(result) => return result,
        };
        info!(secs, "waiting for next refresh");
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}

/// A single-shot run ends with the refresh result. In watch mode a failed
/// refresh is reported and the loop carries on.
fn next_tick(result: anyhow::Result<()>, watch: Option<u64>) -> ControlFlow<anyhow::Result<()>, u64> {
    let Some(secs) = watch else {
        return ControlFlow::Break(result);
    };
    if let Err(e) = result {
        warn!(error = %e, "refresh failed, retrying on next tick");
        eprintln!("warning: refresh failed: {e:#}");
    }
    ControlFlow::Continue(secs.max(1))
}
