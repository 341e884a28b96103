//! Average exchange rates (table A) of the National Bank of Poland.

use super::{ExchangeRates, RateCache, RateError, HOME_CURRENCY};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::{Duration, Instant};

const NBP_API_URL: &str = "https://api.nbp.pl";

/// Days searched backwards from D-1 before giving up.
pub const MAX_LOOKBACK_DAYS: u32 = 10;

/// Rates as published for a single day.
pub trait RateSource {
    /// `Ok(None)` when nothing was published for `date` (weekend, holiday).
    fn fetch(&self, currency: &str, date: NaiveDate) -> Result<Option<Decimal>, RateError>;
}

#[derive(Debug, Deserialize)]
struct NbpResponse {
    rates: Vec<NbpRate>,
}

#[derive(Debug, Deserialize)]
struct NbpRate {
    mid: Decimal,
}

pub struct NbpClient {
    client: Client,
    base_url: String,
}

impl NbpClient {
    pub fn new() -> Result<Self, RateError> {
        Self::with_base_url(NBP_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, RateError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(NbpClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl RateSource for NbpClient {
    fn fetch(&self, currency: &str, date: NaiveDate) -> Result<Option<Decimal>, RateError> {
        let url = format!(
            "{}/api/exchangerates/rates/a/{}/{}?format=json",
            self.base_url,
            currency.to_lowercase(),
            date
        );

        log::debug!("Sending request to {}...", url);
        let start = Instant::now();
        let response = self.client.get(&url).send()?;
        log::debug!("Got response from {} ({:?}).", url, start.elapsed());

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: NbpResponse = response.json()?;
                body.rates
                    .first()
                    .map(|rate| Some(rate.mid))
                    .ok_or_else(|| RateError::EmptyResponse {
                        currency: currency.to_string(),
                        date,
                    })
            }
            status => Err(RateError::Status {
                url,
                status: status.as_u16(),
            }),
        }
    }
}

/// D-1 rates from a [`RateSource`], memoized in a [`RateCache`].
pub struct NbpRates<S = NbpClient> {
    source: S,
    cache: RateCache,
}

impl<S: RateSource> NbpRates<S> {
    pub fn new(source: S, cache: RateCache) -> Self {
        NbpRates { source, cache }
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }
}

impl<S: RateSource> ExchangeRates for NbpRates<S> {
    fn rate(&mut self, currency: &str, time: NaiveDateTime) -> Result<Decimal, RateError> {
        if currency == HOME_CURRENCY {
            return Ok(Decimal::ONE);
        }

        let date = time.date();
        if let Some(rate) = self.cache.get(date, currency) {
            return Ok(rate);
        }

        let not_found = || RateError::NotFound {
            currency: currency.to_string(),
            date,
        };
        let mut day = date;
        for _ in 0..MAX_LOOKBACK_DAYS {
            day = day.pred_opt().ok_or_else(not_found)?;
            if let Some(rate) = self.source.fetch(currency, day)? {
                let rate = rate.round_dp(4);
                log::debug!("{} rate for {} (published {}): {}", currency, date, day, rate);
                self.cache.insert(date, currency, rate);
                return Ok(rate);
            }
        }
        Err(not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::at;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves rates from a table and records every requested day.
    #[derive(Default)]
    struct Published {
        rates: HashMap<(String, NaiveDate), Decimal>,
        requests: RefCell<Vec<NaiveDate>>,
    }

    impl Published {
        fn with(mut self, currency: &str, date: &str, rate: Decimal) -> Self {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
            self.rates.insert((currency.to_string(), date), rate);
            self
        }
    }

    impl RateSource for &Published {
        fn fetch(&self, currency: &str, date: NaiveDate) -> Result<Option<Decimal>, RateError> {
            self.requests.borrow_mut().push(date);
            Ok(self.rates.get(&(currency.to_string(), date)).copied())
        }
    }

    #[test]
    fn walks_back_over_the_weekend() {
        // 2021-04-04 is a Sunday; Friday 2021-04-02 was a holiday in the table
        let published = Published::default().with("USD", "2021-04-01", dec!(3.898649));
        let mut rates = NbpRates::new(&published, RateCache::in_memory());

        let rate = rates.rate("USD", at("2021-04-04 12:00:00")).unwrap();
        assert_eq!(rate, dec!(3.8986));
        assert_eq!(published.requests.borrow().len(), 3);

        let date = NaiveDate::from_ymd_opt(2021, 4, 4).unwrap();
        assert_eq!(rates.cache().get(date, "USD"), Some(dec!(3.8986)));
    }

    #[test]
    fn cached_rates_skip_the_source() {
        let published = Published::default();
        let mut cache = RateCache::in_memory();
        cache.insert(NaiveDate::from_ymd_opt(2000, 1, 5).unwrap(), "GBP", dec!(7.77));
        let mut rates = NbpRates::new(&published, cache);

        assert_eq!(rates.rate("GBP", at("2000-01-05")).unwrap(), dec!(7.77));
        assert!(published.requests.borrow().is_empty());
    }

    #[test]
    fn same_day_rate_is_not_used() {
        let published = Published::default()
            .with("EUR", "2021-03-10", dec!(4.6))
            .with("EUR", "2021-03-09", dec!(4.5));
        let mut rates = NbpRates::new(&published, RateCache::in_memory());
        assert_eq!(rates.rate("EUR", at("2021-03-10 09:00:00")).unwrap(), dec!(4.5));
    }

    #[test]
    fn unknown_currency_gives_up() {
        let published = Published::default();
        let mut rates = NbpRates::new(&published, RateCache::in_memory());

        let err = rates.rate("xUSD", at("2021-04-04")).unwrap_err();
        assert!(matches!(err, RateError::NotFound { ref currency, .. } if currency == "xUSD"));
        assert_eq!(published.requests.borrow().len(), MAX_LOOKBACK_DAYS as usize);
    }

    #[test]
    fn home_currency_is_one() {
        let published = Published::default();
        let mut rates = NbpRates::new(&published, RateCache::in_memory());
        assert_eq!(rates.rate(HOME_CURRENCY, at("2021-04-04")).unwrap(), Decimal::ONE);
        assert!(published.requests.borrow().is_empty());
    }
}
