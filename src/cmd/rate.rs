use crate::rates::{ExchangeRates, NbpClient, NbpRates, RateCache};
use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use std::path::PathBuf;

/// Prints the PLN rate that applies to a transaction made on `date`.
#[derive(Args, Debug)]
pub struct RateCommand {
    /// Currency code, e.g. USD
    currency: String,

    /// Transaction date (YYYY-MM-DD); the rate of the previous publication day is used
    date: NaiveDate,

    /// File the exchange rates are cached in
    #[arg(long, default_value_os_t = super::default_cache())]
    cache: PathBuf,
}

impl RateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let currency = self.currency.to_uppercase();
        let mut rates = NbpRates::new(NbpClient::new()?, RateCache::load(&self.cache));
        let rate = rates.rate(&currency, self.date.and_time(NaiveTime::MIN))?;
        rates
            .cache()
            .save()
            .with_context(|| format!("saving rate cache {}", self.cache.display()))?;
        println!("{}", rate);
        Ok(())
    }
}
