use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::asset::Market;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter API provider for fiat exchange rates.
///
/// - **Free**: Keyless public API, self-hostable.
/// - **Source**: European Central Bank (ECB) reference rates, KRW included.
/// - **Endpoint**: `/{date}?base=USD&symbols=KRW`
///
/// For a non-publishing day the API answers with the previous business
/// day's rates; that answer is reported as "no data" so the caller's own
/// look-back decides which day is used.
pub struct FrankfurterProvider {
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the provider at a different host (self-hosted Frankfurter).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    date: String,
    rates: HashMap<String, f64>,
}

#[async_trait]
impl PriceProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    fn supported_markets(&self) -> Vec<Market> {
        vec![Market::Fx]
    }

    async fn get_close(
        &self,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, CoreError> {
        let base = symbol.to_uppercase();
        let target = currency.to_uppercase();

        // Same currency → rate is 1.0
        if base == target {
            return Ok(Some(1.0));
        }

        let date_str = date.format("%Y-%m-%d");
        let url = format!(
            "{}/{date_str}?base={base}&symbols={target}",
            self.base_url
        );

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse rate for {base}/{target} on {date}: {e}"),
            })?;

        let published = NaiveDate::parse_from_str(&resp.date, "%Y-%m-%d").ok();
        if published != Some(date) {
            tracing::debug!(%base, %target, %date, published = %resp.date, "no FX fixing on requested day");
            return Ok(None);
        }

        Ok(resp.rates.get(&target).copied())
    }
}
