//! Home-currency exchange rates at D-1.

pub mod cache;
pub mod nbp;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

pub use cache::RateCache;
pub use nbp::{NbpClient, NbpRates, RateSource};

/// Currency tax is assessed in.
pub const HOME_CURRENCY: &str = "PLN";

#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("no {currency} exchange rate published in the days before {date}")]
    NotFound { currency: String, date: NaiveDate },
    #[error("exchange rate request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("exchange rate service returned {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("unexpected exchange rate response for {currency} on {date}")]
    EmptyResponse { currency: String, date: NaiveDate },
}

/// Converts a cash flow dated `time` into the home currency.
pub trait ExchangeRates {
    /// Home-currency units per one unit of `currency`, as published on the
    /// last day with a rate strictly before `time`'s date.
    fn rate(&mut self, currency: &str, time: NaiveDateTime) -> Result<Decimal, RateError>;
}

/// The same rate for every currency and day.
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub Decimal);

impl ExchangeRates for FixedRate {
    fn rate(&mut self, _currency: &str, _time: NaiveDateTime) -> Result<Decimal, RateError> {
        Ok(self.0)
    }
}
