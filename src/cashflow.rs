//! FIFO matching of sells against buys, producing home-currency cash flows.

use crate::ledger::{DividendEvent, Ledger, LedgerItem, Side, TradeLot};
use crate::rates::{ExchangeRates, RateError};
use crate::warnings::{Warning, Warnings};
use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CashFlowKind {
    Trade,
    Commission,
    Dividend,
    Tax,
}

/// A signed money movement. `count * price` is the amount in `currency`.
///
/// Sell proceeds have a positive count, matched buy costs a negative one.
/// Commissions always have a count of -1, dividends and taxes a count of 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowEntry {
    pub kind: CashFlowKind,
    /// Execution time of the lot the entry comes from, so a matched buy leg
    /// keeps the buy's own time.
    pub time: NaiveDateTime,
    pub count: Decimal,
    pub price: Decimal,
    pub currency: String,
    pub home_rate: Decimal,
}

impl CashFlowEntry {
    pub fn amount(&self) -> Decimal {
        self.count * self.price
    }

    /// Amount in the home currency, rounded to the cent.
    pub fn home_amount(&self) -> Decimal {
        (self.count * self.price * self.home_rate).round_dp(2)
    }
}

pub type CashFlows = BTreeMap<String, Vec<CashFlowEntry>>;
pub type YearlyCashFlows = BTreeMap<i32, CashFlows>;

/// Matches every symbol of the ledger. The ledger itself is left untouched, so
/// matching the same ledger twice gives the same result.
pub fn match_ledger<R>(
    ledger: &Ledger,
    rates: &mut R,
    warnings: &mut Warnings,
) -> Result<CashFlows, RateError>
where
    R: ExchangeRates + ?Sized,
{
    let mut flows = CashFlows::new();
    for symbol in ledger.symbols() {
        if let Some(entries) = match_symbol(symbol, ledger.items(symbol), rates, warnings)? {
            flows.insert(symbol.to_string(), entries);
        }
    }
    Ok(flows)
}

/// Buy lot with what is left of it after earlier matches.
#[derive(Debug)]
struct OpenLot {
    time: NaiveDateTime,
    count: Decimal,
    price: Decimal,
    commission: Decimal,
}

fn match_symbol<R>(
    symbol: &str,
    items: &[LedgerItem],
    rates: &mut R,
    warnings: &mut Warnings,
) -> Result<Option<Vec<CashFlowEntry>>, RateError>
where
    R: ExchangeRates + ?Sized,
{
    let mut sells: Vec<&TradeLot> = Vec::new();
    let mut buys: VecDeque<OpenLot> = VecDeque::new();
    let mut dividends: Vec<&DividendEvent> = Vec::new();
    for item in items {
        match item {
            LedgerItem::Trade(lot) if lot.side == Side::Sell => sells.push(lot),
            LedgerItem::Trade(lot) => buys.push_back(OpenLot {
                time: lot.time,
                count: lot.count,
                price: lot.price,
                commission: lot.commission,
            }),
            LedgerItem::Dividend(dividend) => dividends.push(dividend),
        }
    }

    // dividends of such a symbol are skipped as well
    if buys.is_empty() && dividends.is_empty() {
        warnings.push(Warning::NoBuyLots {
            symbol: symbol.to_string(),
        });
        return Ok(None);
    }

    let mut entries = Vec::new();
    for sell in sells {
        let currency = sell.currency.as_str();
        let sell_rate = rates.rate(currency, sell.time)?;
        let flow = |kind, time, count, price, home_rate| CashFlowEntry {
            kind,
            time,
            count,
            price,
            currency: currency.to_string(),
            home_rate,
        };

        entries.push(flow(CashFlowKind::Trade, sell.time, sell.count, sell.price, sell_rate));
        entries.push(flow(
            CashFlowKind::Commission,
            sell.time,
            Decimal::NEGATIVE_ONE,
            sell.commission,
            sell_rate,
        ));

        let mut remaining = sell.count;
        while remaining > Decimal::ZERO {
            let Some(buy) = buys.front_mut() else {
                break;
            };
            let buy_rate = rates.rate(currency, buy.time)?;

            if buy.count <= remaining {
                log::debug!(
                    "{} SELL {} at {}: closes lot of {} from {}",
                    symbol,
                    remaining,
                    sell.time,
                    buy.count,
                    buy.time
                );
                entries.push(flow(CashFlowKind::Trade, buy.time, -buy.count, buy.price, buy_rate));
                entries.push(flow(
                    CashFlowKind::Commission,
                    buy.time,
                    Decimal::NEGATIVE_ONE,
                    buy.commission,
                    buy_rate,
                ));
                remaining -= buy.count;
                buys.pop_front();
            } else {
                let commission = (buy.commission * remaining / buy.count).round_dp(2);
                log::debug!(
                    "{} SELL {} at {}: partial match of lot {} from {}, commission {} of {}",
                    symbol,
                    remaining,
                    sell.time,
                    buy.count,
                    buy.time,
                    commission,
                    buy.commission
                );
                entries.push(flow(CashFlowKind::Trade, buy.time, -remaining, buy.price, buy_rate));
                // the split commission is converted at the sell's rate
                entries.push(flow(
                    CashFlowKind::Commission,
                    buy.time,
                    Decimal::NEGATIVE_ONE,
                    commission,
                    sell_rate,
                ));
                buy.count -= remaining;
                buy.commission -= commission;
                remaining = Decimal::ZERO;
            }
        }

        if remaining > Decimal::ZERO {
            warnings.push(Warning::UnmatchedSell {
                symbol: symbol.to_string(),
                time: sell.time,
                count: remaining,
            });
        }
    }

    for dividend in dividends {
        let rate = rates.rate(&dividend.currency, dividend.time)?;
        for (kind, value) in [
            (CashFlowKind::Dividend, dividend.value),
            (CashFlowKind::Tax, dividend.tax),
        ] {
            entries.push(CashFlowEntry {
                kind,
                time: dividend.time,
                count: Decimal::ONE,
                price: value,
                currency: dividend.currency.clone(),
                home_rate: rate,
            });
        }
    }

    Ok(Some(entries))
}

/// Buckets entries by the calendar year of their `time`.
pub fn partition_by_year(flows: &CashFlows) -> YearlyCashFlows {
    let mut yearly = YearlyCashFlows::new();
    for (symbol, entries) in flows {
        for entry in entries {
            yearly
                .entry(entry.time.year())
                .or_default()
                .entry(symbol.clone())
                .or_default()
                .push(entry.clone());
        }
    }
    yearly
}
