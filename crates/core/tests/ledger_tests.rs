// ═══════════════════════════════════════════════════════════════════
// Ledger Tests: holdings from transactions, accounts, CSV sources
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::io::Write;

use holdings_dashboard_core::errors::CoreError;
use holdings_dashboard_core::models::asset::{Asset, AssetRegistry};
use holdings_dashboard_core::models::ledger::{
    LedgerColumns, LedgerRow, LedgerTable, TradeType, UnknownTradePolicy,
};
use holdings_dashboard_core::models::settings::Settings;
use holdings_dashboard_core::providers::sheet_ledger::{
    parse_ledger_csv, CsvLedgerSource, LedgerLocation, StaticLedgerSource,
};
use holdings_dashboard_core::providers::traits::LedgerSource;
use holdings_dashboard_core::services::ledger_service::LedgerService;

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn pension_service(policy: UnknownTradePolicy) -> LedgerService {
    LedgerService::new(Settings::default().pension_registry().unwrap(), policy)
}

fn table(columns: &[&str], rows: &[&[&str]]) -> LedgerTable {
    LedgerTable::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

/// Two accounts, the pension one holding S&P500 and MMF.
fn sample_ledger() -> LedgerTable {
    table(
        &["날짜", "계좌", "종목명", "구분", "수량"],
        &[
            &["2024-01-02", "미래에셋 연금저축", "TIGER 미국S&P500", "매수", "10"],
            &["2024-02-01", "미래에셋 연금저축", "TIGER 미국S&P500", "매도", "3"],
            &["2024-02-05", "키움 일반", "TIGER 미국S&P500", "매수", "100"],
            &["2024-03-01", "미래에셋 연금저축", "RISE 머니마켓액티브", "매수", "1,200"],
            &["2024-03-02", "미래에셋 연금저축", "RISE 머니마켓액티브", "분배금", "4"],
        ],
    )
}

struct FailingLedger;

#[async_trait]
impl LedgerSource for FailingLedger {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get_rows(&self) -> Result<LedgerTable, CoreError> {
        Err(CoreError::LedgerUnavailable("HTTP 403".into()))
    }
}

fn ticker_shares(
    holdings: &std::collections::HashMap<Asset, i64>,
    ticker: &str,
) -> Option<i64> {
    holdings
        .iter()
        .find(|(a, _)| a.ticker == ticker)
        .map(|(_, s)| *s)
}

// ═══════════════════════════════════════════════════════════════════
// Net shares & holdings
// ═══════════════════════════════════════════════════════════════════

mod holdings {
    use super::*;

    #[test]
    fn buy_minus_sell() {
        let svc = pension_service(UnknownTradePolicy::Exclude);
        let rows = vec![
            LedgerRow::new("TIGER 미국S&P500", 10.0, TradeType::Buy),
            LedgerRow::new("TIGER 미국S&P500", 3.0, TradeType::Sell),
        ];
        assert_eq!(svc.net_shares(&rows, "미국S&P500"), 7);
        let holdings = svc.holdings(&rows);
        assert_eq!(ticker_shares(&holdings, "360750"), Some(7));
    }

    #[test]
    fn no_matching_rows_is_zero() {
        let svc = pension_service(UnknownTradePolicy::Exclude);
        let rows = vec![LedgerRow::new("삼성전자", 5.0, TradeType::Buy)];
        assert_eq!(svc.net_shares(&rows, "골드선물"), 0);
    }

    #[test]
    fn every_asset_present() {
        let svc = pension_service(UnknownTradePolicy::Exclude);
        let holdings = svc.holdings(&[]);
        assert_eq!(holdings.len(), 5);
        assert!(holdings.values().all(|&s| s == 0));
    }

    #[test]
    fn fractional_totals_truncate() {
        let svc = pension_service(UnknownTradePolicy::Exclude);
        let rows = vec![
            LedgerRow::new("KODEX 골드선물(H)", 2.5, TradeType::Buy),
            LedgerRow::new("KODEX 골드선물(H)", 0.9, TradeType::Buy),
        ];
        assert_eq!(svc.net_shares(&rows, "골드선물"), 3);

        let oversold = vec![LedgerRow::new("KODEX 골드선물(H)", 1.5, TradeType::Sell)];
        assert_eq!(svc.net_shares(&oversold, "골드선물"), -1);
    }

    #[test]
    fn unknown_rows_follow_policy() {
        let rows = vec![
            LedgerRow::new("RISE 머니마켓액티브", 10.0, TradeType::Buy),
            LedgerRow::new("RISE 머니마켓액티브", 2.0, TradeType::Unknown),
        ];
        let exclude = pension_service(UnknownTradePolicy::Exclude);
        assert_eq!(exclude.net_shares(&rows, "머니마켓"), 10);
        let include = pension_service(UnknownTradePolicy::TreatAsBuy);
        assert_eq!(include.net_shares(&rows, "머니마켓"), 12);
    }

    #[test]
    fn ambiguous_row_counts_once_for_first_asset() {
        let registry = AssetRegistry::new(vec![
            Asset::krx("A", "S&P500").with_target_weight(0.5),
            Asset::krx("B", "미국S&P500").with_target_weight(0.5),
        ])
        .unwrap();
        let svc = LedgerService::new(registry, UnknownTradePolicy::Exclude);
        let rows = vec![LedgerRow::new("TIGER 미국S&P500", 4.0, TradeType::Buy)];

        let holdings = svc.holdings(&rows);
        assert_eq!(ticker_shares(&holdings, "A"), Some(4));
        assert_eq!(ticker_shares(&holdings, "B"), Some(0));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Accounts
// ═══════════════════════════════════════════════════════════════════

mod accounts {
    use super::*;

    #[test]
    fn account_names_in_first_seen_order() {
        let (accounts, column) = LedgerService::account_names(&sample_ledger());
        assert_eq!(column.as_deref(), Some("계좌"));
        assert_eq!(accounts, ["미래에셋 연금저축", "키움 일반"]);
    }

    #[test]
    fn account_column_by_english_header() {
        let t = table(&["Account", "종목명", "수량"], &[&["IRA", "x", "1"]]);
        let (accounts, column) = LedgerService::account_names(&t);
        assert_eq!(column.as_deref(), Some("Account"));
        assert_eq!(accounts, ["IRA"]);
    }

    #[test]
    fn no_account_column() {
        let t = table(&["종목명", "수량"], &[&["x", "1"]]);
        assert_eq!(LedgerService::account_names(&t), (Vec::new(), None));
        assert!(LedgerService::find_account(&t, "연금저축").is_none());
    }

    #[test]
    fn filter_keeps_header_and_matching_rows() {
        let ledger = sample_ledger();
        let filtered = LedgerService::filter_by_account(&ledger, "계좌", "키움 일반");
        assert_eq!(filtered.columns, ledger.columns);
        assert_eq!(filtered.len(), 1);

        let unknown_column = LedgerService::filter_by_account(&ledger, "없음", "키움 일반");
        assert!(unknown_column.is_empty());
        assert_eq!(unknown_column.columns, ledger.columns);
    }

    #[test]
    fn find_account_by_keyword() {
        let found = LedgerService::find_account(&sample_ledger(), "연금저축");
        assert_eq!(
            found,
            Some(("미래에셋 연금저축".to_string(), "계좌".to_string()))
        );
        assert!(LedgerService::find_account(&sample_ledger(), "ISA").is_none());
    }

    #[test]
    fn typed_rows_skip_bad_quantities() {
        let t = table(
            &["종목명", "구분", "수량"],
            &[&["a", "매수", "1"], &["b", "매수", "-"], &["c", "매도", "2"]],
        );
        let cols = LedgerColumns::detect(&t).unwrap();
        let rows = LedgerService::typed_rows(&t, cols);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], LedgerRow::new("c", 2.0, TradeType::Sell));
    }

    #[test]
    fn trade_type_prefers_gubun_over_trade_date() {
        let t = table(
            &["거래일자", "계좌", "종목명", "구분", "수량"],
            &[
                &["2024-01-02", "미래에셋 연금저축", "TIGER 미국S&P500", "매수", "10"],
                &["2024-02-01", "미래에셋 연금저축", "TIGER 미국S&P500", "매도", "3"],
            ],
        );
        let cols = LedgerColumns::detect(&t).unwrap();
        assert_eq!(cols.trade_type, Some(3));

        let svc = pension_service(UnknownTradePolicy::Exclude);
        let holdings = svc.account_holdings(&t, "연금저축");
        assert_eq!(ticker_shares(&holdings, "360750"), Some(7));
    }

    #[test]
    fn trade_type_falls_back_to_georae() {
        let t = table(&["종목명", "거래유형", "수량"], &[&["a", "매수", "1"]]);
        let cols = LedgerColumns::detect(&t).unwrap();
        assert_eq!(cols.trade_type, Some(1));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Pension account holdings
// ═══════════════════════════════════════════════════════════════════

mod account_holdings {
    use super::*;

    #[test]
    fn only_pension_account_counts() {
        let svc = pension_service(UnknownTradePolicy::Exclude);
        let holdings = svc.account_holdings(&sample_ledger(), "연금저축");
        assert_eq!(ticker_shares(&holdings, "360750"), Some(7));
        assert_eq!(ticker_shares(&holdings, "455890"), Some(1200));
        assert_eq!(ticker_shares(&holdings, "132030"), Some(0));
    }

    #[test]
    fn treat_unknown_as_buy_includes_distributions() {
        let svc = pension_service(UnknownTradePolicy::TreatAsBuy);
        let holdings = svc.account_holdings(&sample_ledger(), "연금저축");
        assert_eq!(ticker_shares(&holdings, "455890"), Some(1204));
    }

    #[test]
    fn empty_when_account_missing() {
        let svc = pension_service(UnknownTradePolicy::Exclude);
        assert!(svc.account_holdings(&sample_ledger(), "ISA").is_empty());
        assert!(svc.account_holdings(&LedgerTable::default(), "연금저축").is_empty());
    }

    #[test]
    fn empty_when_columns_missing() {
        let t = table(&["계좌", "메모"], &[&["연금저축", "hello"]]);
        let svc = pension_service(UnknownTradePolicy::Exclude);
        assert!(svc.account_holdings(&t, "연금저축").is_empty());
    }

    #[test]
    fn missing_trade_type_column_counts_nothing_by_default() {
        let t = table(
            &["계좌", "종목명", "수량"],
            &[&["연금저축", "TIGER 미국S&P500", "10"]],
        );
        let exclude = pension_service(UnknownTradePolicy::Exclude);
        let holdings = exclude.account_holdings(&t, "연금저축");
        assert_eq!(ticker_shares(&holdings, "360750"), Some(0));

        let include = pension_service(UnknownTradePolicy::TreatAsBuy);
        let holdings = include.account_holdings(&t, "연금저축");
        assert_eq!(ticker_shares(&holdings, "360750"), Some(10));
    }

    #[tokio::test]
    async fn pension_holdings_from_static_source() {
        let svc = pension_service(UnknownTradePolicy::Exclude);
        let source = StaticLedgerSource::new(sample_ledger());
        let holdings = svc.pension_holdings(&source, "연금저축").await;
        assert_eq!(ticker_shares(&holdings, "360750"), Some(7));
    }

    #[tokio::test]
    async fn pension_holdings_fail_soft() {
        let svc = pension_service(UnknownTradePolicy::Exclude);
        let holdings = svc.pension_holdings(&FailingLedger, "연금저축").await;
        assert!(holdings.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// CSV parsing & sources
// ═══════════════════════════════════════════════════════════════════

mod csv_source {
    use super::*;

    const SAMPLE_CSV: &str = "\u{feff}날짜,계좌,종목명,구분,수량\n\
        2024-01-02,미래에셋 연금저축,TIGER 미국S&P500,매수,10\n\
        ,,,,\n\
        2024-02-01,미래에셋 연금저축, TIGER 미국S&P500 ,매도,3\n\
        2024-02-05,키움 일반,KODEX 골드선물(H),매수\n";

    #[test]
    fn parse_strips_bom_and_blank_rows() {
        let t = parse_ledger_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(t.columns[0], "날짜");
        assert_eq!(t.len(), 3);
        assert_eq!(t.cell(1, 2), "TIGER 미국S&P500");
        // Short record: the quantity cell reads as empty
        assert_eq!(t.cell(2, 4), "");
    }

    #[test]
    fn parse_quoted_thousands() {
        let csv = "종목명,구분,수량\n\"RISE 머니마켓액티브\",매수,\"1,200\"\n";
        let t = parse_ledger_csv(csv.as_bytes()).unwrap();
        assert_eq!(t.cell(0, 2), "1,200");
    }

    #[test]
    fn parse_header_only() {
        let t = parse_ledger_csv("종목명,수량\n".as_bytes()).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns.len(), 2);
    }

    #[tokio::test]
    async fn file_source_reads_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CSV.as_bytes()).unwrap();

        let source = CsvLedgerSource::from_location(&file.path().to_string_lossy());
        assert!(matches!(source.location(), LedgerLocation::File(_)));

        let t = source.get_rows().await.unwrap();
        assert_eq!(t.len(), 3);

        let svc = pension_service(UnknownTradePolicy::Exclude);
        let holdings = svc.pension_holdings(&source, "연금저축").await;
        assert_eq!(ticker_shares(&holdings, "360750"), Some(7));
    }

    #[tokio::test]
    async fn missing_file_is_ledger_unavailable() {
        let source = CsvLedgerSource::from_location("/no/such/ledger.csv");
        let err = source.get_rows().await.unwrap_err();
        assert!(matches!(err, CoreError::LedgerUnavailable(_)));
    }

    #[tokio::test]
    async fn static_source_returns_table() {
        let source = StaticLedgerSource::new(sample_ledger());
        assert_eq!(source.name(), "static");
        assert_eq!(source.get_rows().await.unwrap(), sample_ledger());
    }
}
