use holdings_dashboard_core::models::analytics::SummaryReport;
use holdings_dashboard_core::models::ledger::LedgerTable;
use holdings_dashboard_core::models::rebalance::{HoldingsSource, RebalanceReport, TradeAction};
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct PlanLine {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Held")]
    held: i64,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Target")]
    target_shares: i64,
    #[tabled(rename = "Target weight")]
    target_weight: String,
    #[tabled(rename = "Buy/Sell")]
    delta: String,
    #[tabled(rename = "Value now")]
    current_value: String,
    #[tabled(rename = "Value after")]
    after_value: String,
    #[tabled(rename = "Trade")]
    trade: String,
}

#[derive(Tabled)]
struct HoldingLine {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Shares")]
    shares: String,
    #[tabled(rename = "Avg price")]
    avg_price: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Return")]
    return_pct: String,
    #[tabled(rename = "P&L")]
    profit_loss: String,
}

#[derive(Tabled)]
struct TotalLine {
    #[tabled(rename = "Book")]
    book: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Invested")]
    invested: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Return")]
    return_pct: String,
    #[tabled(rename = "P&L")]
    profit_loss: String,
}

pub(crate) fn rebalance(report: &RebalanceReport) -> String {
    let plan = &report.plan;
    let lines: Vec<PlanLine> = plan
        .rows
        .iter()
        .map(|row| PlanLine {
            asset: row.asset.display_name.clone(),
            price: if row.price > 0.0 {
                money(row.price, 0)
            } else {
                "n/a".to_string()
            },
            held: row.current_shares,
            weight: format!("{:.1}%", row.current_weight * 100.0),
            target_shares: row.target_shares,
            target_weight: format!("{:.1}%", row.target_weight * 100.0),
            delta: format!("{:+}", row.share_delta),
            current_value: money(row.current_value, 0),
            after_value: money(row.after_value, 0),
            trade: match row.action {
                TradeAction::Hold => "-".to_string(),
                action => format!("{} ({action})", money(row.trade_value, 0)),
            },
        })
        .collect();

    let mut out = String::new();
    out.push_str(&format!("Pension rebalancing as of {}\n", report.as_of));
    if report.holdings_source == HoldingsSource::Fallback {
        out.push_str("Holdings: ledger unavailable, using configured share counts\n");
    }
    out.push_str(&format!(
        "Total {}  |  After rebalancing {}  |  Residual cash {}\n",
        money(plan.total_current_value, 0),
        money(plan.total_after_value, 0),
        money(plan.residual_cash, 0),
    ));
    if (plan.weight_sum - 1.0).abs() > 1e-6 {
        out.push_str(&format!(
            "Warning: target weights sum to {:.1}%\n",
            plan.weight_sum * 100.0
        ));
    }
    let unpriced = plan.unpriced();
    if !unpriced.is_empty() {
        out.push_str(&format!("Warning: no price for {}\n", unpriced.join(", ")));
    }
    out.push_str(&Table::new(lines).with(Style::rounded()).to_string());
    out
}

pub(crate) fn summary(report: &SummaryReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Portfolio summary as of {}\n", report.as_of));

    for segment in &report.segments {
        let decimals = if segment.currency == report.combined.home_currency { 0 } else { 2 };
        out.push_str(&format!("\n{} ({})\n", segment.name, segment.currency));
        let lines: Vec<HoldingLine> = segment
            .holdings
            .iter()
            .map(|h| HoldingLine {
                name: h.asset.display_name.clone(),
                ticker: h.asset.ticker.clone(),
                shares: money(h.shares, 0),
                avg_price: money(h.avg_price, decimals),
                price: money(h.current_price, decimals),
                value: money(h.current_value, decimals),
                return_pct: format!("{:+.2}%", h.return_pct),
                profit_loss: signed_money(h.profit_loss, decimals),
            })
            .collect();
        out.push_str(&Table::new(lines).with(Style::rounded()).to_string());
        out.push('\n');
        if !segment.unpriced.is_empty() {
            out.push_str(&format!("No price for {}\n", segment.unpriced.join(", ")));
        }
    }

    let combined = &report.combined;
    let mut totals: Vec<TotalLine> = combined
        .segments
        .iter()
        .map(|s| TotalLine {
            book: s.name.clone(),
            rate: match report.exchange_rates.get(&s.currency) {
                Some(r) => format!("{} ({:?})", money(r.rate, 2), r.source),
                None => "-".to_string(),
            },
            invested: money(s.total_investment, 0),
            value: money(s.total_current_value, 0),
            return_pct: format!("{:+.2}%", s.total_return_pct),
            profit_loss: signed_money(s.total_profit_loss, 0),
        })
        .collect();
    totals.push(TotalLine {
        book: "Total".to_string(),
        rate: combined.home_currency.clone(),
        invested: money(combined.total_investment, 0),
        value: money(combined.total_current_value, 0),
        return_pct: format!("{:+.2}%", combined.total_return_pct),
        profit_loss: signed_money(combined.total_profit_loss, 0),
    });
    out.push_str(&format!("\nCombined ({})\n", combined.home_currency));
    out.push_str(&Table::new(totals).with(Style::rounded()).to_string());
    out
}

pub(crate) fn accounts(accounts: &[String], column: Option<&str>) -> String {
    match column {
        None => "No account column found in the ledger".to_string(),
        Some(column) => {
            let mut out = format!("Accounts (column '{column}'):\n");
            for account in accounts {
                out.push_str(&format!(" - {account}\n"));
            }
            out
        }
    }
}

pub(crate) fn ledger(table: &LedgerTable) -> String {
    if table.is_empty() {
        return "No transactions".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(table.columns.iter().cloned());
    for row in &table.rows {
        builder.push_record(row.iter().cloned());
    }
    let mut rendered = builder.build();
    rendered.with(Style::rounded());
    rendered.to_string()
}

/// Format with thousands separators, e.g. `1234567.5` → `1,234,567.50`.
fn money(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn signed_money(value: f64, decimals: usize) -> String {
    let formatted = money(value, decimals);
    if formatted.starts_with('-') {
        formatted
    } else {
        format!("+{formatted}")
    }
}
