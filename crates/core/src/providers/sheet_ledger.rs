use async_trait::async_trait;
use reqwest::Client;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::traits::LedgerSource;
use crate::errors::CoreError;
use crate::models::ledger::LedgerTable;

/// Where a spreadsheet CSV export lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLocation {
    File(PathBuf),
    /// e.g. `https://docs.google.com/spreadsheets/d/<id>/export?format=csv&gid=<sheet>`
    Url(String),
}

impl LedgerLocation {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            LedgerLocation::Url(trimmed.to_string())
        } else {
            LedgerLocation::File(PathBuf::from(trimmed))
        }
    }
}

impl std::fmt::Display for LedgerLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerLocation::File(path) => write!(f, "{}", path.display()),
            // The query string of a sheet export may carry an access token.
            LedgerLocation::Url(url) => match url.find('?') {
                Some(idx) => write!(f, "{}?<query redacted>", &url[..idx]),
                None => write!(f, "{url}"),
            },
        }
    }
}

/// Parse a CSV export into a [`LedgerTable`].
///
/// Rows may be shorter or longer than the header. A UTF-8 byte-order mark
/// on the first header is dropped.
pub fn parse_ledger_csv<R: Read>(reader: R) -> Result<LedgerTable, CoreError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!(columns = columns.len(), rows = rows.len(), "parsed ledger csv");
    Ok(LedgerTable::new(columns, rows))
}

/// Ledger backed by a spreadsheet's CSV export, read from disk or over HTTP.
pub struct CsvLedgerSource {
    location: LedgerLocation,
    label: String,
    client: Client,
}

impl CsvLedgerSource {
    pub fn new(location: LedgerLocation) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            label: location.to_string(),
            location,
            client,
        }
    }

    pub fn from_location(location: &str) -> Self {
        Self::new(LedgerLocation::parse(location))
    }

    pub fn location(&self) -> &LedgerLocation {
        &self.location
    }
}

#[async_trait]
impl LedgerSource for CsvLedgerSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn get_rows(&self) -> Result<LedgerTable, CoreError> {
        match &self.location {
            LedgerLocation::File(path) => {
                let file = std::fs::File::open(path).map_err(|e| {
                    CoreError::LedgerUnavailable(format!("Failed to open {}: {e}", path.display()))
                })?;
                parse_ledger_csv(file)
            }
            LedgerLocation::Url(url) => {
                let body = self
                    .client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                parse_ledger_csv(body.as_ref())
            }
        }
    }
}

/// Ledger holding a fixed table, for tests and pre-loaded data.
#[derive(Debug, Clone, Default)]
pub struct StaticLedgerSource {
    table: LedgerTable,
}

impl StaticLedgerSource {
    pub fn new(table: LedgerTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl LedgerSource for StaticLedgerSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_rows(&self) -> Result<LedgerTable, CoreError> {
        Ok(self.table.clone())
    }
}
