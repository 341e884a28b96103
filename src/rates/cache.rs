use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Decimal places kept for a cached rate.
const RATE_SCALE: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to write rate cache {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize rate cache: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rates keyed by `"{date} {currency}"`, where the date is the transaction
/// date the rate was requested for.
#[derive(Debug, Default, Clone)]
pub struct RateCache {
    path: Option<PathBuf>,
    rates: BTreeMap<String, Decimal>,
}

impl RateCache {
    /// A cache that is never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the cache file. A missing or unreadable file gives an empty
    /// cache that will still be saved to `path`.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let rates = match File::open(&path) {
            Ok(file) => match serde_json::from_reader::<_, BTreeMap<String, Value>>(BufReader::new(file)) {
                Ok(raw) => raw
                    .into_iter()
                    .filter_map(|(key, value)| match parse_rate(&value) {
                        Some(rate) => Some((key, rate.round_dp(RATE_SCALE))),
                        None => {
                            log::debug!("Skipping invalid cached rate {}: {}", key, value);
                            None
                        }
                    })
                    .collect(),
                Err(err) => {
                    log::warn!("Ignoring corrupt rate cache {}: {}", path.display(), err);
                    BTreeMap::new()
                }
            },
            Err(err) => {
                log::debug!("No rate cache at {}: {}", path.display(), err);
                BTreeMap::new()
            }
        };
        log::debug!("Loaded {} cached rates from {}", rates.len(), path.display());
        RateCache {
            path: Some(path),
            rates,
        }
    }

    pub fn save(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_error = |source| CacheError::Io {
            path: path.clone(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.rates)?;
        writer.flush().map_err(io_error)?;
        Ok(())
    }

    pub fn get(&self, date: NaiveDate, currency: &str) -> Option<Decimal> {
        self.rates.get(&key(date, currency)).copied()
    }

    pub fn insert(&mut self, date: NaiveDate, currency: &str, rate: Decimal) {
        self.rates.insert(key(date, currency), rate.round_dp(RATE_SCALE));
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

fn key(date: NaiveDate, currency: &str) -> String {
    format!("{} {}", date, currency)
}

/// Accepts rates stored either as JSON numbers or as strings.
fn parse_rate(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
