use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

/// Recoverable conditions reported while loading a ledger or matching it.
///
/// None of these abort a run: the affected row or symbol is skipped and the
/// remaining symbols are still reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A ledger row could not be turned into a ledger item.
    UnparsedRow { row: usize, message: String },
    /// A symbol has no buy lots and no dividends, so nothing is produced for it.
    NoBuyLots { symbol: String },
    /// A sell had more units than the buy queue could cover.
    UnmatchedSell {
        symbol: String,
        time: NaiveDateTime,
        count: Decimal,
    },
    /// A trade never received its price or commission companion row.
    IncompleteLot { symbol: String, time: NaiveDateTime },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnparsedRow { message, .. } => write!(f, "{}", message),
            Warning::NoBuyLots { symbol } => {
                write!(f, "No BUY transactions for symbol: {}.", symbol)
            }
            Warning::UnmatchedSell {
                symbol,
                time,
                count,
            } => write!(
                f,
                "Sell of {} at {} left {} unit(s) without a matching BUY.",
                symbol, time, count
            ),
            Warning::IncompleteLot { symbol, time } => write!(
                f,
                "Trade of {} at {} is missing its price or commission and was skipped.",
                symbol, time
            ),
        }
    }
}

/// Collects warnings and echoes each one to the log as it arrives.
#[derive(Debug, Default, Clone)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn push(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.items.push(warning);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}
