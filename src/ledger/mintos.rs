//! Mintos account statement. Interest-like income is booked as dividends of a
//! single pseudo-instrument.

use super::{column, parse_datetime, parse_decimal, BrokerFormat, LedgerBuilder, ParseError};
use encoding_rs::{Encoding, UTF_8};

const TIME: usize = 0;
const DETAILS: usize = 2;
const TURNOVER: usize = 3;
const CURRENCY: usize = 5;

pub const SYMBOL: &str = "Mintos";

const INCOME: [&str; 3] = [
    "interest received",
    "late fees received",
    "refer a friend bonus",
];

pub struct Mintos;

impl BrokerFormat for Mintos {
    fn delimiter(&self) -> u8 {
        b','
    }

    fn encoding(&self) -> &'static Encoding {
        UTF_8
    }

    fn order_key<'a>(&self, row: &'a [String]) -> &'a str {
        row.get(TIME).map(String::as_str).unwrap_or_default()
    }

    fn parse_row(&self, row: &[String], ledger: &mut LedgerBuilder) -> Result<(), ParseError> {
        if row.len() <= 1 {
            return Ok(());
        }
        let details = column(row, DETAILS)?.to_lowercase();
        if !INCOME.iter().any(|income| details.contains(income)) {
            return Ok(());
        }

        let time = parse_datetime(column(row, TIME)?)?;
        let value = parse_decimal(row, TURNOVER)?;
        let currency = column(row, CURRENCY)?;
        ledger.open_dividend(time, SYMBOL, value, currency);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::at;
    use crate::ledger::LedgerItem;
    use crate::warnings::Warnings;
    use rust_decimal_macros::dec;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn only_income_rows_are_kept() {
        let data = [
            row(&["2020-01-01 00:00:01", "1", "Loan 21157138-01 - interest received", "2.5E-5", "", "EUR"]),
            row(&["2020-01-01 00:00:02", "1", "Loan 21157138-01 - late fees received", "1.25E-5", "", "EUR"]),
            row(&["2020-01-01 00:00:03", "1", "Loan 21157138-01 - interest received", "20.000000", "", "EUR"]),
            row(&["2020-01-01 00:00:04", "1", "Loan 21157138-01 - secondary market fee", "20.000000", "", "EUR"]),
            row(&["2020-01-01 00:00:05", "1", "Loan 21157138-01 - discount/premium for secondary market transaction", "20.000000", "", "EUR"]),
            row(&["invalid"]),
        ];

        let mut builder = LedgerBuilder::new();
        for r in &data {
            Mintos.parse_row(r, &mut builder).unwrap();
        }
        let ledger = builder.finish(&mut Warnings::default());

        let items = ledger.items(SYMBOL);
        assert_eq!(items.len(), 3);
        let values: Vec<_> = items
            .iter()
            .map(|item| match item {
                LedgerItem::Dividend(d) => {
                    assert_eq!(d.currency, "EUR");
                    assert!(d.time >= at("2020-01-01 00:00:01"));
                    assert_eq!(d.symbol, SYMBOL);
                    assert_eq!(d.tax, dec!(0));
                    d.value
                }
                LedgerItem::Trade(_) => panic!("expected a dividend"),
            })
            .collect();
        assert_eq!(values, vec![dec!(0.000025), dec!(0.0000125), dec!(20)]);
        let LedgerItem::Dividend(first) = &items[0] else {
            panic!("expected a dividend");
        };
        assert_eq!(first.time, at("2020-01-01 00:00:01"));
    }
}
