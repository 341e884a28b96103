//! Reductions of cash flows into report tables.
//!
//! Foreign-currency figures are plain sums. Home-currency figures round every
//! entry to the cent before summing, the way brokers report per leg.

pub mod display;

use crate::cashflow::{CashFlowEntry, CashFlowKind, CashFlows, YearlyCashFlows};
use clap::ValueEnum;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Flat tax on dividends and interest.
pub const TAX_RATE: Decimal = dec!(0.19);

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("commission entries of {symbol} with a positive count do not net to zero")]
    CommissionInvariant { symbol: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Amount(Decimal),
    /// Already rounded to a whole number.
    Whole(Decimal),
}

impl Cell {
    fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Amount(d) | Cell::Whole(d) => Some(*d),
            Cell::Text(_) => None,
        }
    }
}

/// Positional report rows under a header. `footer` rows (separators and
/// totals) follow the data rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub footer: Vec<Vec<Cell>>,
}

impl Table {
    fn new(header: &[&str]) -> Self {
        Table {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            footer: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when some data row has a non-zero amount.
    fn has_figures(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .filter_map(Cell::as_decimal)
            .any(|d| !d.is_zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Trades per symbol in the trade currency
    Foreign,
    /// Trades per symbol in PLN, with a total
    Home,
    /// Trade income and cost in PLN over all symbols
    Total,
    /// Dividends and withheld tax per symbol
    Dividend,
    /// Dividends and the tax left to pay, in PLN
    DividendHome,
    /// Interest income per symbol
    Interest,
    /// Interest income and tax due, in PLN
    InterestHome,
}

impl ReportKind {
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Foreign => "Trades (foreign currency)",
            ReportKind::Home => "Trades (PLN)",
            ReportKind::Total => "Trades total (PLN)",
            ReportKind::Dividend => "Dividends (foreign currency)",
            ReportKind::DividendHome => "Dividends (PLN)",
            ReportKind::Interest => "Interest (foreign currency)",
            ReportKind::InterestHome => "Interest (PLN)",
        }
    }

    pub fn build(&self, flows: &CashFlows) -> Result<Table, ReportError> {
        match self {
            ReportKind::Foreign => foreign_summary(flows),
            ReportKind::Home => home_summary(flows),
            ReportKind::Total => Ok(home_total(flows)),
            ReportKind::Dividend => Ok(dividends_foreign(flows)),
            ReportKind::DividendHome => Ok(dividends_home(flows)),
            ReportKind::Interest => Ok(interest_foreign(flows)),
            ReportKind::InterestHome => Ok(interest_home(flows)),
        }
    }

    /// One table over all years, every row led by its year. Years without
    /// non-zero figures are left out.
    pub fn build_by_year(&self, yearly: &YearlyCashFlows) -> Result<Table, ReportError> {
        let mut table = self.build(&CashFlows::new())?;
        table.header.insert(0, "year".to_string());
        table.rows.clear();
        table.footer.clear();

        for (year, flows) in yearly {
            let year_table = self.build(flows)?;
            if !year_table.has_figures() {
                continue;
            }
            let with_year = |row: Vec<Cell>| {
                let mut cells = vec![Cell::text(year.to_string())];
                cells.extend(row);
                cells
            };
            table.rows.extend(year_table.rows.into_iter().map(with_year));
            table.footer.extend(year_table.footer.into_iter().map(with_year));
        }
        Ok(table)
    }
}

fn sum<'a, I, F>(entries: I, value: F) -> Decimal
where
    I: IntoIterator<Item = &'a CashFlowEntry>,
    F: Fn(&CashFlowEntry) -> Decimal,
{
    entries.into_iter().map(value).sum()
}

fn is_sale(entry: &CashFlowEntry) -> bool {
    entry.kind == CashFlowKind::Trade && entry.count > Decimal::ZERO
}

fn is_purchase(entry: &CashFlowEntry) -> bool {
    entry.kind == CashFlowKind::Trade && entry.count < Decimal::ZERO
}

fn of_kind(kind: CashFlowKind) -> impl Fn(&&CashFlowEntry) -> bool {
    move |entry: &&CashFlowEntry| entry.kind == kind
}

fn check_commissions(symbol: &str, entries: &[CashFlowEntry]) -> Result<(), ReportError> {
    let positive = sum(
        entries
            .iter()
            .filter(|e| e.kind == CashFlowKind::Commission && e.count > Decimal::ZERO),
        CashFlowEntry::amount,
    );
    if positive.is_zero() {
        Ok(())
    } else {
        Err(ReportError::CommissionInvariant {
            symbol: symbol.to_string(),
        })
    }
}

/// Trade income, cost and commission of one symbol, valued by `value`.
struct TradeSummary {
    income: Decimal,
    trade_cost: Decimal,
    commission: Decimal,
}

impl TradeSummary {
    fn new(entries: &[CashFlowEntry], value: impl Fn(&CashFlowEntry) -> Decimal + Copy) -> Self {
        TradeSummary {
            income: sum(entries.iter().filter(|e| is_sale(e)), value),
            trade_cost: -sum(entries.iter().filter(|e| is_purchase(e)), value),
            commission: -sum(entries.iter().filter(of_kind(CashFlowKind::Commission)), value),
        }
    }

    fn cost(&self) -> Decimal {
        self.trade_cost + self.commission
    }

    fn profit(&self) -> Decimal {
        self.income - self.cost()
    }
}

/// Per symbol: income, cost (trades and commissions), P/L and the commission
/// part of the cost, in the trade currency.
pub fn foreign_summary(flows: &CashFlows) -> Result<Table, ReportError> {
    let mut table = Table::new(&["symbol", "currency", "income", "cost", "P/L", "(commission)"]);
    for (symbol, entries) in flows {
        let Some(first) = entries.first() else {
            continue;
        };
        let summary = TradeSummary::new(entries, CashFlowEntry::amount);
        if summary.income.is_zero() {
            continue;
        }
        check_commissions(symbol, entries)?;
        table.rows.push(vec![
            Cell::text(symbol),
            Cell::text(&first.currency),
            Cell::Amount(summary.income),
            Cell::Amount(summary.cost()),
            Cell::Amount(summary.profit()),
            Cell::Amount(summary.commission),
        ]);
    }
    Ok(table)
}

/// [`foreign_summary`] in the home currency, followed by a total.
pub fn home_summary(flows: &CashFlows) -> Result<Table, ReportError> {
    let mut table = Table::new(&["symbol", "income", "cost", "P/L", "(commission)"]);
    let mut total_income = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;

    for (symbol, entries) in flows {
        let summary = TradeSummary::new(entries, CashFlowEntry::home_amount);
        if summary.income.is_zero() {
            continue;
        }
        check_commissions(symbol, entries)?;
        table.rows.push(vec![
            Cell::text(symbol),
            Cell::Amount(summary.income),
            Cell::Amount(summary.cost()),
            Cell::Amount(summary.profit()),
            Cell::Amount(summary.commission),
        ]);
        total_income += summary.income;
        total_cost += summary.cost();
    }

    table.footer.push(vec![Cell::text("-----")]);
    table.footer.push(vec![
        Cell::text("TOTAL"),
        Cell::Amount(total_income),
        Cell::Amount(total_cost),
        Cell::Amount(total_income - total_cost),
    ]);
    Ok(table)
}

/// Income and cost over every symbol. The cost counts every negative entry,
/// so it includes the commissions of buys and sells.
pub fn home_total(flows: &CashFlows) -> Table {
    let mut table = Table::new(&["income [PIT38 C22]", "cost [PIT38 C23]", "P/L"]);
    let entries = || flows.values().flatten();
    let income = sum(entries().filter(|e| is_sale(e)), CashFlowEntry::home_amount);
    let cost = -sum(
        entries().filter(|e| e.count < Decimal::ZERO),
        CashFlowEntry::home_amount,
    );
    table.rows.push(vec![
        Cell::Amount(income),
        Cell::Amount(cost),
        Cell::Amount(income - cost),
    ]);
    table
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    (part / whole * dec!(100)).round()
}

/// Per symbol: gross dividends, tax withheld at source and its share.
pub fn dividends_foreign(flows: &CashFlows) -> Table {
    let mut table = Table::new(&["symbol", "currency", "income", "paid tax", "%"]);
    for (symbol, entries) in flows {
        let Some(first) = entries.first() else {
            continue;
        };
        let income = sum(entries.iter().filter(of_kind(CashFlowKind::Dividend)), |e| e.price);
        let tax = sum(entries.iter().filter(of_kind(CashFlowKind::Tax)), |e| e.price);
        if income > Decimal::ZERO {
            table.rows.push(vec![
                Cell::text(symbol),
                Cell::text(&first.currency),
                Cell::Amount(income),
                Cell::Amount(tax),
                Cell::Whole(percent(tax, income)),
            ]);
        }
    }
    table
}

/// Dividends of all symbols in the home currency, with the tax due and what
/// is left to pay after crediting the tax withheld abroad.
pub fn dividends_home(flows: &CashFlows) -> Table {
    let mut table = Table::new(&[
        "income",
        "paid tax [PIT38 G45]",
        "%",
        "total to pay (19%) [PIT38 G46]",
        "left to pay (19%) [PIT38 G47]",
    ]);
    let entries = || flows.values().flatten();
    let income = sum(
        entries().filter(of_kind(CashFlowKind::Dividend)),
        CashFlowEntry::home_amount,
    );
    let paid_tax = sum(
        entries().filter(of_kind(CashFlowKind::Tax)),
        CashFlowEntry::home_amount,
    );
    if income > Decimal::ZERO {
        let due = (income * TAX_RATE).round_dp(2);
        table.rows.push(vec![
            Cell::Amount(income),
            Cell::Amount(paid_tax),
            Cell::Whole(percent(paid_tax, income)),
            Cell::Amount(due),
            Cell::Whole((due - paid_tax).round()),
        ]);
    }
    table
}

/// Per symbol interest income in the payment currency.
pub fn interest_foreign(flows: &CashFlows) -> Table {
    let mut table = Table::new(&["symbol", "currency", "income"]);
    for (symbol, entries) in flows {
        let Some(first) = entries.first() else {
            continue;
        };
        let income = sum(entries.iter().filter(of_kind(CashFlowKind::Dividend)), |e| e.price);
        if income > Decimal::ZERO {
            table.rows.push(vec![
                Cell::text(symbol),
                Cell::text(&first.currency),
                Cell::Amount(income),
            ]);
        }
    }
    table
}

/// Interest income in the home currency and the tax due on it.
///
/// Interest arrives in many tiny payments, so the converted amounts are
/// summed first and rounded once.
pub fn interest_home(flows: &CashFlows) -> Table {
    let mut table = Table::new(&[
        "income",
        "total to pay (19%) [PIT38 G46]",
        "tax (19%) [PIT38 G47]",
    ]);
    let income = sum(
        flows
            .values()
            .flatten()
            .filter(of_kind(CashFlowKind::Dividend)),
        |e| e.price * e.home_rate,
    )
    .round_dp(2);
    if income > Decimal::ZERO {
        let due = (income * TAX_RATE).round_dp(2);
        table.rows.push(vec![
            Cell::Amount(income),
            Cell::Amount(due),
            Cell::Whole(due.round()),
        ]);
    }
    table
}
