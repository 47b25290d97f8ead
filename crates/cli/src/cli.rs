use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "holdings-dashboard", version, about = "Pension rebalancing and P&L for your holdings")]
pub(crate) struct Cli {
    #[arg(short, long, global = true, help = "Settings file (JSON)")]
    pub config: Option<PathBuf>,
    #[arg(
        short,
        long,
        global = true,
        help = "Ledger CSV path or http(s) export URL, overrides the settings"
    )]
    pub ledger: Option<String>,
    #[arg(long, global = true, help = "Reference date (YYYY-MM-DD), defaults to today")]
    pub date: Option<NaiveDate>,
    #[arg(long, global = true, help = "Print JSON instead of tables")]
    pub json: bool,
    #[arg(
        short,
        long,
        global = true,
        value_name = "SECS",
        help = "Re-run the whole refresh every SECS seconds"
    )]
    pub watch: Option<u64>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Compute the pension rebalancing plan
    Rebalance {
        #[arg(
            short,
            long,
            value_name = "TICKER=SHARES",
            value_delimiter = ',',
            value_parser = parse_share_override,
            help = "Replace the share count of a holding"
        )]
        shares: Vec<(String, i64)>,
    },
    /// Summarise P&L across every book in the home currency
    Summary {
        #[arg(
            short,
            long,
            value_name = "[CUR=]RATE",
            value_parser = parse_exchange_rate,
            help = "Fix an exchange rate (home currency per unit); a bare number means USD"
        )]
        exchange_rate: Vec<(String, f64)>,
    },
    /// List the accounts found in the ledger
    Accounts,
    /// Show the transactions of one account
    Ledger {
        #[arg(short, long, help = "Account name fragment, defaults to the pension account")]
        account: Option<String>,
    },
}

fn parse_share_override(raw: &str) -> Result<(String, i64), String> {
    let (ticker, shares) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TICKER=SHARES, got '{raw}'"))?;
    let shares = shares
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid share count in '{raw}': {e}"))?;
    if shares < 0 {
        return Err(format!("share count must not be negative, got {shares}"));
    }
    Ok((ticker.trim().to_uppercase(), shares))
}

fn parse_exchange_rate(raw: &str) -> Result<(String, f64), String> {
    let (currency, rate) = raw.split_once('=').unwrap_or(("USD", raw));
    let rate = rate
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid exchange rate in '{raw}': {e}"))?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(format!("exchange rate must be positive, got {rate}"));
    }
    Ok((currency.trim().to_uppercase(), rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_override_parses() {
        assert_eq!(
            parse_share_override("360750=480").unwrap(),
            ("360750".to_string(), 480)
        );
        assert!(parse_share_override("360750").is_err());
        assert!(parse_share_override("360750=abc").is_err());
        assert_eq!(parse_share_override("360750=0").unwrap().1, 0);
        assert!(parse_share_override("360750=-5").is_err());
    }

    #[test]
    fn bare_exchange_rate_means_usd() {
        assert_eq!(parse_exchange_rate("1380").unwrap(), ("USD".to_string(), 1380.0));
        assert_eq!(parse_exchange_rate("eur=1500.5").unwrap(), ("EUR".to_string(), 1500.5));
        assert!(parse_exchange_rate("USD=-1").is_err());
    }

    #[test]
    fn cli_parses_rebalance_with_overrides() {
        let cli = Cli::parse_from([
            "holdings-dashboard",
            "rebalance",
            "--shares",
            "360750=480,132030=250",
            "--date",
            "2025-03-14",
        ]);
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2025, 3, 14));
        match cli.command {
            Command::Rebalance { shares } => assert_eq!(shares.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
