//! Exante transaction log: tab separated, UTF-16, ordered by transaction id.
//!
//! A trade is spread over several rows sharing symbol and timestamp: the
//! instrument row carries the signed quantity, a second TRADE row the traded
//! value in the settlement currency, and a COMMISSION row the fee.

use super::{column, parse_datetime, parse_decimal, BrokerFormat, LedgerBuilder, ParseError};
use encoding_rs::{Encoding, UTF_16LE};

const ID: usize = 0;
const SYMBOL: usize = 2;
const ISIN: usize = 3;
const OPERATION: usize = 4;
const TIME: usize = 5;
const SUM: usize = 6;
const ASSET: usize = 7;

/// ISIN value of the cash legs of a transaction.
const NO_ISIN: &str = "None";

pub struct Exante;

impl BrokerFormat for Exante {
    fn delimiter(&self) -> u8 {
        b'\t'
    }

    fn encoding(&self) -> &'static Encoding {
        UTF_16LE
    }

    fn order_key<'a>(&self, row: &'a [String]) -> &'a str {
        row.get(ID).map(String::as_str).unwrap_or_default()
    }

    fn parse_row(&self, row: &[String], ledger: &mut LedgerBuilder) -> Result<(), ParseError> {
        let operation = column(row, OPERATION)?;
        match operation {
            "FUNDING/WITHDRAWAL" => return Ok(()),
            "TRADE" | "COMMISSION" | "DIVIDEND" | "TAX" => {}
            other => return Err(ParseError::UnsupportedOperation(other.to_string())),
        }

        let time = parse_datetime(column(row, TIME)?)?;
        let symbol = column(row, SYMBOL)?;
        let isin = column(row, ISIN)?;
        let asset = column(row, ASSET)?;
        let sum = parse_decimal(row, SUM)?;

        let accepted = match operation {
            "TRADE" if isin != NO_ISIN && asset == symbol => {
                ledger.open_trade(time, symbol, sum)?;
                true
            }
            "DIVIDEND" => {
                ledger.open_dividend(time, symbol, sum, asset);
                true
            }
            "TRADE" if isin == NO_ISIN => ledger.trade_value(symbol, time, sum, asset),
            "COMMISSION" if isin == NO_ISIN => ledger.commission(symbol, time, sum),
            "TAX" => ledger.tax(symbol, time, sum),
            _ => false,
        };
        if !accepted {
            log::debug!("Ignoring {} row for {} at {}", operation, symbol, time);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::at;
    use crate::ledger::{LedgerItem, Side};
    use crate::warnings::Warnings;
    use rust_decimal_macros::dec;

    fn row(fields: [&str; 10]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn parse(rows: &[[&str; 10]]) -> crate::ledger::Ledger {
        let mut builder = LedgerBuilder::new();
        for r in rows {
            Exante.parse_row(&row(*r), &mut builder).unwrap();
        }
        builder.finish(&mut Warnings::default())
    }

    #[test]
    fn funding_rows_are_skipped() {
        let mut builder = LedgerBuilder::new();
        let data = row(["", "", "SYMBOL", "ISIN", "FUNDING/WITHDRAWAL", "2020-01-01 00:00:00", "1000", "USD", "", ""]);
        Exante.parse_row(&data, &mut builder).unwrap();
        assert!(builder.finish(&mut Warnings::default()).is_empty());
    }

    #[test]
    fn unsupported_operations_are_errors() {
        for op in ["AUTOCONVERSION", "BLAH BLAH BLAH"] {
            let mut builder = LedgerBuilder::new();
            let data = row(["", "", "SYMBOL", "ISIN", op, "2020-01-01 00:00:00", "1000", "USD", "", ""]);
            let err = Exante.parse_row(&data, &mut builder).unwrap_err();
            assert_eq!(err, ParseError::UnsupportedOperation(op.to_string()));
            assert!(err.to_string().contains(op));
        }
    }

    #[test]
    fn buy_and_sell_trades() {
        let ledger = parse(&[
            ["1", "", "ABC", "ISIN", "TRADE", "2020-01-01 00:00:00", "150", "ABC", "", ""],
            ["2", "", "ABC", "None", "TRADE", "2020-01-01 00:00:00", "1500", "USD", "", ""],
            ["3", "", "ABC", "None", "COMMISSION", "2020-01-01 00:00:00", "-3.0", "USD", "", ""],
            ["4", "", "ABC", "ISIN", "TRADE", "2020-01-01 00:00:00", "-150", "ABC", "", ""],
            ["5", "", "ABC", "None", "TRADE", "2020-01-01 00:00:00", "1500", "USD", "", ""],
            ["6", "", "ABC", "None", "COMMISSION", "2020-01-01 00:00:00", "-3.0", "USD", "", ""],
        ]);

        let items = ledger.items("ABC");
        assert_eq!(items.len(), 2);
        let LedgerItem::Trade(buy) = &items[0] else {
            panic!("expected a trade");
        };
        assert_eq!(buy.time, at("2020-01-01 00:00:00"));
        assert_eq!(buy.symbol, "ABC");
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.count, dec!(150));
        assert_eq!(buy.price, dec!(10));
        assert_eq!(buy.currency, "USD");
        assert_eq!(buy.commission, dec!(3));

        let LedgerItem::Trade(sell) = &items[1] else {
            panic!("expected a trade");
        };
        assert_eq!(sell.side, Side::Sell);
    }

    #[test]
    fn dividend_with_tax() {
        let ledger = parse(&[
            ["1", "", "ABC", "None", "DIVIDEND", "2020-01-01 00:00:00", "10", "USD", "", ""],
            ["2", "", "ABC", "None", "TAX", "2020-01-01 00:00:00", "-2", "USD", "", ""],
        ]);

        let items = ledger.items("ABC");
        assert_eq!(items.len(), 1);
        let LedgerItem::Dividend(dividend) = &items[0] else {
            panic!("expected a dividend");
        };
        assert_eq!(dividend.time, at("2020-01-01 00:00:00"));
        assert_eq!(dividend.symbol, "ABC");
        assert_eq!(dividend.value, dec!(10));
        assert_eq!(dividend.tax, dec!(2));
        assert_eq!(dividend.currency, "USD");
    }

    #[test]
    fn companion_row_without_open_record_is_ignored() {
        let ledger = parse(&[
            ["1", "", "ABC", "None", "COMMISSION", "2020-01-01 00:00:00", "-3.0", "USD", "", ""],
        ]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn invalid_timestamp() {
        let mut builder = LedgerBuilder::new();
        let data = row(["1", "", "ABC", "ISIN", "TRADE", "yesterday", "1", "ABC", "", ""]);
        assert_eq!(
            Exante.parse_row(&data, &mut builder),
            Err(ParseError::InvalidTime("yesterday".to_string()))
        );
    }
}
