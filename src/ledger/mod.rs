//! Typed ledger records and the assembly of multi-row transactions.

pub mod exante;
pub mod mintos;
pub mod reader;

use crate::warnings::{Warning, Warnings};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use encoding_rs::Encoding;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

pub use reader::{load_csv, load_paths, parse_rows};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unsupported transaction type {0}.")]
    UnsupportedOperation(String),
    #[error("row has {found} column(s), expected at least {expected}")]
    MissingColumn { expected: usize, found: usize },
    #[error("invalid number in column {column}: {value:?}")]
    InvalidNumber { column: usize, value: String },
    #[error("invalid timestamp: {0:?}")]
    InvalidTime(String),
    #[error("trade of {0} has zero quantity")]
    ZeroQuantity(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// One buy or sell execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeLot {
    pub time: NaiveDateTime,
    pub side: Side,
    pub symbol: String,
    /// Always positive, the direction is carried by `side`.
    pub count: Decimal,
    pub price: Decimal,
    pub currency: String,
    pub commission: Decimal,
}

/// One dividend payment with the tax withheld from it.
#[derive(Debug, Clone, PartialEq)]
pub struct DividendEvent {
    pub time: NaiveDateTime,
    pub symbol: String,
    pub value: Decimal,
    pub currency: String,
    pub tax: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerItem {
    Trade(TradeLot),
    Dividend(DividendEvent),
}

/// Ledger items grouped by symbol, each group in parse order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    items: BTreeMap<String, Vec<LedgerItem>>,
}

impl Ledger {
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn items(&self, symbol: &str) -> &[LedgerItem] {
        self.items.get(symbol).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends all items of `other`, keeping each symbol's order.
    pub fn extend(&mut self, other: Ledger) {
        for (symbol, mut items) in other.items {
            self.items.entry(symbol).or_default().append(&mut items);
        }
    }
}

#[derive(Debug, Clone)]
struct PendingTrade {
    time: NaiveDateTime,
    side: Side,
    symbol: String,
    count: Decimal,
    price: Option<Decimal>,
    currency: Option<String>,
    commission: Option<Decimal>,
}

#[derive(Debug, Clone)]
enum Pending {
    Trade(PendingTrade),
    Dividend(DividendEvent),
}

impl Pending {
    fn time(&self) -> NaiveDateTime {
        match self {
            Pending::Trade(trade) => trade.time,
            Pending::Dividend(dividend) => dividend.time,
        }
    }
}

/// Assembles ledger items from a primary row plus its companion rows.
///
/// Each symbol has at most one open record: the one most recently started. A
/// companion row patches it only when the timestamps match exactly, otherwise
/// the row is dropped. Starting a new record for a symbol, or calling
/// [`LedgerBuilder::finish`], moves the open record into the ledger.
#[derive(Debug, Default)]
pub struct LedgerBuilder {
    done: BTreeMap<String, Vec<Pending>>,
    open: HashMap<String, Pending>,
}

impl LedgerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a trade; a positive `signed_count` is a buy, a negative one a sell.
    pub fn open_trade(
        &mut self,
        time: NaiveDateTime,
        symbol: &str,
        signed_count: Decimal,
    ) -> Result<(), ParseError> {
        if signed_count.is_zero() {
            return Err(ParseError::ZeroQuantity(symbol.to_string()));
        }
        let side = if signed_count > Decimal::ZERO {
            Side::Buy
        } else {
            Side::Sell
        };
        self.open(
            symbol,
            Pending::Trade(PendingTrade {
                time,
                side,
                symbol: symbol.to_string(),
                count: signed_count.abs(),
                price: None,
                currency: None,
                commission: None,
            }),
        );
        Ok(())
    }

    pub fn open_dividend(
        &mut self,
        time: NaiveDateTime,
        symbol: &str,
        value: Decimal,
        currency: &str,
    ) {
        self.open(
            symbol,
            Pending::Dividend(DividendEvent {
                time,
                symbol: symbol.to_string(),
                value,
                currency: currency.to_string(),
                tax: Decimal::ZERO,
            }),
        );
    }

    /// Sets the unit price from the total traded value. Returns whether an open
    /// trade accepted it.
    pub fn trade_value(
        &mut self,
        symbol: &str,
        time: NaiveDateTime,
        total: Decimal,
        currency: &str,
    ) -> bool {
        match self.companion_target(symbol, time) {
            Some(Pending::Trade(trade)) => {
                trade.price = Some((total / trade.count).abs());
                trade.currency = Some(currency.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn commission(&mut self, symbol: &str, time: NaiveDateTime, amount: Decimal) -> bool {
        match self.companion_target(symbol, time) {
            Some(Pending::Trade(trade)) => {
                trade.commission = Some(amount.abs());
                true
            }
            _ => false,
        }
    }

    pub fn tax(&mut self, symbol: &str, time: NaiveDateTime, amount: Decimal) -> bool {
        match self.companion_target(symbol, time) {
            Some(Pending::Dividend(dividend)) => {
                dividend.tax = amount.abs();
                true
            }
            _ => false,
        }
    }

    /// Closes every open record and returns the finished ledger.
    ///
    /// Trades still missing their price or commission are dropped with a
    /// warning.
    pub fn finish(mut self, warnings: &mut Warnings) -> Ledger {
        for (symbol, pending) in std::mem::take(&mut self.open) {
            self.done.entry(symbol).or_default().push(pending);
        }

        let mut ledger = Ledger::default();
        for (symbol, records) in self.done {
            let items: Vec<LedgerItem> = records
                .into_iter()
                .filter_map(|pending| match pending {
                    Pending::Dividend(dividend) => Some(LedgerItem::Dividend(dividend)),
                    Pending::Trade(trade) => match (trade.price, trade.currency, trade.commission) {
                        (Some(price), Some(currency), Some(commission)) => {
                            Some(LedgerItem::Trade(TradeLot {
                                time: trade.time,
                                side: trade.side,
                                symbol: trade.symbol,
                                count: trade.count,
                                price,
                                currency,
                                commission,
                            }))
                        }
                        _ => {
                            warnings.push(Warning::IncompleteLot {
                                symbol: trade.symbol,
                                time: trade.time,
                            });
                            None
                        }
                    },
                })
                .collect();
            if !items.is_empty() {
                ledger.items.insert(symbol, items);
            }
        }
        ledger
    }

    fn open(&mut self, symbol: &str, record: Pending) {
        if let Some(previous) = self.open.insert(symbol.to_string(), record) {
            self.done
                .entry(symbol.to_string())
                .or_default()
                .push(previous);
        }
    }

    fn companion_target(&mut self, symbol: &str, time: NaiveDateTime) -> Option<&mut Pending> {
        let pending = self.open.get_mut(symbol)?;
        if pending.time() == time {
            Some(pending)
        } else {
            log::debug!(
                "Dropping companion row for {} at {}: open record is at {}",
                symbol,
                time,
                pending.time()
            );
            None
        }
    }
}

/// A broker export layout: how its rows are decoded, ordered and parsed.
pub trait BrokerFormat {
    fn delimiter(&self) -> u8;

    /// Encoding used when the file carries no byte order mark.
    fn encoding(&self) -> &'static Encoding;

    /// The column the rows are ordered by before parsing.
    fn order_key<'a>(&self, row: &'a [String]) -> &'a str;

    fn parse_row(&self, row: &[String], ledger: &mut LedgerBuilder) -> Result<(), ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Broker {
    Exante,
    Mintos,
}

impl Broker {
    pub fn format(&self) -> &'static dyn BrokerFormat {
        match self {
            Broker::Exante => &exante::Exante,
            Broker::Mintos => &mintos::Mintos,
        }
    }
}

pub(crate) fn column(row: &[String], index: usize) -> Result<&str, ParseError> {
    row.get(index)
        .map(|value| value.trim())
        .ok_or(ParseError::MissingColumn {
            expected: index + 1,
            found: row.len(),
        })
}

/// Parses plain and scientific notation (`2.5E-5`).
pub(crate) fn parse_decimal(row: &[String], index: usize) -> Result<Decimal, ParseError> {
    let value = column(row, index)?;
    let parsed = if value.contains(['e', 'E']) {
        Decimal::from_scientific(value)
    } else {
        Decimal::from_str(value)
    };
    parsed.map_err(|_| ParseError::InvalidNumber {
        column: index,
        value: value.to_string(),
    })
}

/// Parse a timestamp that may be date-only or a full datetime.
pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime, ParseError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| ParseError::InvalidTime(s.to_string()))
}
