use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Latest close resolved for one ticker during a refresh.
///
/// `price == 0.0` with `as_of == None` means no price could be found; callers
/// must treat it as "unavailable", never as a real zero price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub ticker: String,
    pub price: f64,
    /// Trading day the close belongs to (may precede the reference date)
    pub as_of: Option<NaiveDate>,
}

impl PriceQuote {
    pub fn new(ticker: impl Into<String>, price: f64, as_of: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            as_of: Some(as_of),
        }
    }

    /// The "no price found" sentinel.
    pub fn unavailable(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            price: 0.0,
            as_of: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.price > 0.0 && self.as_of.is_some()
    }
}

/// Where a resolved exchange rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    /// Same currency on both sides
    Identity,
    /// Fixed in settings or on the command line
    Configured,
    /// Fetched from the FX provider
    Provider,
    /// Configured fallback after the provider had nothing
    Fallback,
    /// Nothing available; rate is 0 and conversion must not be attempted
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Units of the target currency per unit of the source currency
    pub rate: f64,
    pub source: RateSource,
}
