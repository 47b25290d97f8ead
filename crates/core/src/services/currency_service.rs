use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::models::price::{ExchangeRate, RateSource};
use crate::models::settings::ExchangeRateSettings;
use super::price_service::PriceService;

/// Resolves the exchange-rate scalar used to bring foreign books into the
/// home currency.
///
/// Precedence: identity → configured override → FX provider → configured
/// fallback. Never fails; a missing rate is reported as `Unavailable`.
pub struct CurrencyService {
    settings: ExchangeRateSettings,
}

impl CurrencyService {
    /// Currency codes in `settings` are matched case-insensitively.
    pub fn new(settings: ExchangeRateSettings) -> Self {
        let upper = |rates: HashMap<String, f64>| -> HashMap<String, f64> {
            rates
                .into_iter()
                .map(|(code, rate)| (code.trim().to_uppercase(), rate))
                .collect()
        };
        Self {
            settings: ExchangeRateSettings {
                overrides: upper(settings.overrides),
                fallbacks: upper(settings.fallbacks),
            },
        }
    }

    /// Replace the configured override for `currency`.
    pub fn set_override(&mut self, currency: &str, rate: f64) {
        self.settings.overrides.insert(currency.to_uppercase(), rate);
    }

    pub async fn resolve(
        &self,
        price_service: &PriceService,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> ExchangeRate {
        let from = from_currency.to_uppercase();
        let to = to_currency.to_uppercase();

        if from == to {
            return ExchangeRate {
                rate: 1.0,
                source: RateSource::Identity,
            };
        }

        if let Some(&rate) = self.settings.overrides.get(&from) {
            return ExchangeRate {
                rate,
                source: RateSource::Configured,
            };
        }

        if let Some(rate) = price_service.exchange_rate(&from, &to, date).await {
            info!(%from, %to, rate, "exchange rate from provider");
            return ExchangeRate {
                rate,
                source: RateSource::Provider,
            };
        }

        match self.settings.fallbacks.get(&from) {
            Some(&rate) => {
                warn!(%from, %to, rate, "FX provider had no rate, using configured fallback");
                ExchangeRate {
                    rate,
                    source: RateSource::Fallback,
                }
            }
            None => {
                warn!(%from, %to, "no exchange rate available");
                ExchangeRate {
                    rate: 0.0,
                    source: RateSource::Unavailable,
                }
            }
        }
    }
}

impl Default for CurrencyService {
    fn default() -> Self {
        Self::new(ExchangeRateSettings::default())
    }
}
